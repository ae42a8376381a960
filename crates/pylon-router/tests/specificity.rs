//! Property tests for route ordering.

use http::Method;
use proptest::prelude::*;
use pylon_router::{PathTemplate, Router};

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-c]{1,3}".prop_map(|s| s),
        "[x-z]".prop_map(|s| format!("{{{s}}}")),
    ]
}

fn template() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..4).prop_map(|segs| format!("/{}", segs.join("/")))
}

proptest! {
    #[test]
    fn specificity_is_antisymmetric(a in template(), b in template()) {
        let a = PathTemplate::parse(&a).unwrap();
        let b = PathTemplate::parse(&b).unwrap();
        prop_assert_eq!(a.specificity_cmp(&b), b.specificity_cmp(&a).reverse());
    }

    #[test]
    fn resolution_ignores_registration_order(mut templates in prop::collection::vec(template(), 1..6)) {
        templates.sort();
        templates.dedup();

        let mut forward = Router::new();
        let mut backward = Router::new();
        for t in &templates {
            forward.insert(Method::GET, t, t.clone()).unwrap();
        }
        for t in templates.iter().rev() {
            backward.insert(Method::GET, t, t.clone()).unwrap();
        }

        for t in &templates {
            let concrete_path = t.replace(['{', '}'], "");
            let a = forward.resolve(&Method::GET, &concrete_path).ok().map(|m| m.value.clone());
            let b = backward.resolve(&Method::GET, &concrete_path).ok().map(|m| m.value.clone());
            prop_assert_eq!(a, b);
        }
    }
}
