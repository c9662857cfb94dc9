// src/processors/position.rs

use crate::error::{RowWarning, WarningKind};
use crate::models::ProteinContext;

/// Parse `"<mutated>/<total>"`, e.g. `"123/500"`.
pub fn parse_aa_position(raw: &str) -> Result<ProteinContext, RowWarning> {
    let raw = raw.trim();
    let malformed = |why: &str| {
        RowWarning::new(
            WarningKind::MalformedPosition,
            format!("`{raw}`: {why}"),
        )
    };

    let (mutated, total) = raw
        .split_once('/')
        .ok_or_else(|| malformed("expected <position>/<length>"))?;
    if total.contains('/') {
        return Err(malformed("more than one `/`"));
    }

    let mutated: u32 = mutated
        .trim()
        .parse()
        .map_err(|_| malformed("position is not an integer"))?;
    let total: u32 = total
        .trim()
        .parse()
        .map_err(|_| malformed("length is not an integer"))?;

    if mutated == 0 || total == 0 {
        return Err(malformed("positions are 1-based"));
    }
    if mutated > total {
        return Err(malformed("position exceeds protein length"));
    }

    Ok(ProteinContext {
        mutated_position: Some(mutated),
        total_length: Some(total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_position_and_length() {
        let ctx = parse_aa_position("123/500").unwrap();
        assert_eq!(ctx.mutated_position, Some(123));
        assert_eq!(ctx.total_length, Some(500));

        let ctx = parse_aa_position(" 500 / 500 ").unwrap();
        assert_eq!(ctx.mutated_position, Some(500));
    }

    #[test]
    fn position_past_the_end_is_malformed() {
        let err = parse_aa_position("600/500").unwrap_err();
        assert_eq!(err.kind, WarningKind::MalformedPosition);
    }

    #[test]
    fn rejects_malformed_shapes() {
        for raw in ["", "123", "abc/500", "123/xyz", "1/2/3", "0/10", "-5/10", "12.0/50"] {
            assert!(parse_aa_position(raw).is_err(), "`{raw}` should be rejected");
        }
    }
}
