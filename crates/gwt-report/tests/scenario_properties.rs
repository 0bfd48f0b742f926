//! Scenario expansion properties

use gwt_report::{ReportContext, ReportItem};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_items_follow_report_grammar(
        givens in proptest::collection::vec(any::<i32>(), 0..4),
        pairs in proptest::collection::vec((any::<u8>(), any::<u8>()), 0..6),
        with_when in any::<bool>(),
    ) {
        let context = ReportContext::default();
        let mut run = context.scenario("generated");
        for given in &givens {
            run = run.given(given).unwrap();
        }
        if with_when {
            run = run.when(&"act".to_string()).unwrap();
        }
        for (expected, actual) in &pairs {
            run = run.then(expected, actual).unwrap();
        }
        let result = run.finish();
        let success = pairs.iter().all(|(expected, actual)| expected == actual);
        prop_assert_eq!(result.is_success(), success);

        let items = result.into_items();
        prop_assert_eq!(items.len(), givens.len() + pairs.len() + 3);
        prop_assert!(matches!(items[0], ReportItem::StartScenario { .. }), "first item must be StartScenario");
        prop_assert!(matches!(items[givens.len() + 1], ReportItem::When(_)));
        let is_end_with_success = matches!(
            items.last(),
            Some(ReportItem::EndScenario { success: s, .. }) if *s == success
        );
        prop_assert!(is_end_with_success);
    }
}
