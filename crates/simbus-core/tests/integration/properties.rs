use proptest::prelude::*;
use serde_json::json;
use simbus_core::{Breakpoint, BreakpointCriteria, EventFilter, EventRecord, FilterCriteria};

fn died(name: &str) -> EventRecord {
    EventRecord::new("combat", name, "orc", "died", json!(null))
}

proptest! {
    #[test]
    fn count_breakpoint_triggers_every_nth_match(threshold in 1u32..12, matches in 0u32..80) {
        let mut bp = Breakpoint::new(
            "nth",
            BreakpointCriteria::new(FilterCriteria::default().event_type("died").any()).count(threshold),
        )
        .unwrap();

        let triggered = (0..matches).filter(|_| bp.match_event(&died("grak"))).count() as u32;
        prop_assert_eq!(triggered, matches / threshold);
        prop_assert_eq!(bp.current_count(), matches % threshold);
    }

    #[test]
    fn none_is_negated_any(target in "[a-z]{1,6}", name in "[a-z]{1,6}") {
        let any = EventFilter::allow(FilterCriteria::default().source_name(target.clone()).any()).unwrap();
        let none = EventFilter::allow(FilterCriteria::default().source_name(target).none()).unwrap();
        let event = died(&name);
        prop_assert_eq!(none.match_event(&event), !any.match_event(&event));
    }

    #[test]
    fn all_requires_every_test(source_type in "(orc|elf)", source_name in "(a|b)") {
        let filter = EventFilter::allow(
            FilterCriteria::default().source_type("orc").source_name("a").all(),
        )
        .unwrap();
        let event = EventRecord::new("combat", source_name.clone(), source_type.clone(), "died", json!(null));
        prop_assert_eq!(filter.match_event(&event), source_type == "orc" && source_name == "a");
    }
}
