// src/processors/domain.rs

use crate::models::DomainInterval;

/// 1 when `position` lies inside any domain (bounds inclusive), else 0.
pub fn check_domain_position(position: Option<u32>, domains: &[DomainInterval]) -> u8 {
    match position {
        Some(pos) if domains.iter().any(|d| d.contains(pos)) => 1,
        _ => 0,
    }
}
