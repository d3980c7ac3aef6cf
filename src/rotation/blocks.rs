//! Seniority block counts per equipment category

use crate::config::ScoringConfig;

/// Supplies the configured number of seniority blocks for an equipment category
pub trait BlockRules: Send + Sync {
    /// Numbered blocks, not counting the open block
    fn total_blocks(&self, is_dump_truck: bool) -> i32;

    /// Numbered blocks plus the open block
    fn blocks_including_open(&self, is_dump_truck: bool) -> i32 {
        self.total_blocks(is_dump_truck) + 1
    }
}

/// Block counts read from the `scoring` configuration section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeniorityScoringRules {
    default_total_blocks: i32,
    dump_truck_total_blocks: i32,
}

impl SeniorityScoringRules {
    pub fn new(default_total_blocks: i32, dump_truck_total_blocks: i32) -> Self {
        Self {
            default_total_blocks,
            dump_truck_total_blocks,
        }
    }
}

impl From<&ScoringConfig> for SeniorityScoringRules {
    fn from(config: &ScoringConfig) -> Self {
        Self::new(config.default_total_blocks, config.dump_truck_total_blocks)
    }
}

impl Default for SeniorityScoringRules {
    fn default() -> Self {
        Self::from(&ScoringConfig::default())
    }
}

impl BlockRules for SeniorityScoringRules {
    fn total_blocks(&self, is_dump_truck: bool) -> i32 {
        if is_dump_truck {
            self.dump_truck_total_blocks
        } else {
            self.default_total_blocks
        }
    }
}
