//! Agreement threshold for turning positive swipes into a match.

/// Positive votes a title needs in a room of `member_count` members.
///
/// Defaults to every member. A room-level `threshold` lowers that, but
/// never below one vote and never above the current member count.
#[must_use]
pub fn required_votes(member_count: i64, threshold: Option<i32>) -> i64 {
    let members = member_count.max(1);
    threshold.map_or(members, |t| i64::from(t).clamp(1, members))
}

/// Returns `true` once `positive_votes` reaches `required`.
#[must_use]
pub const fn threshold_reached(positive_votes: i64, required: i64) -> bool {
    positive_votes >= required
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_all_members() {
        assert_eq!(required_votes(3, None), 3);
    }

    #[test]
    fn threshold_is_capped_by_members() {
        assert_eq!(required_votes(3, Some(5)), 3);
        assert_eq!(required_votes(5, Some(2)), 2);
        assert_eq!(required_votes(4, Some(0)), 1);
    }

    #[test]
    fn empty_room_needs_one_vote() {
        assert_eq!(required_votes(0, None), 1);
    }

    #[test]
    fn three_member_scenario() {
        let required = required_votes(3, None);
        assert!(!threshold_reached(2, required));
        assert!(threshold_reached(3, required));
    }
}
