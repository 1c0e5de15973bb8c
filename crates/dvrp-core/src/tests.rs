use std::collections::BTreeMap;

use crate::{ConfigError, LocationId, OrderId, SimTime};

mod time_tests {
    use super::*;

    #[test]
    fn checked_constructor_rejects_non_finite() {
        assert!(matches!(
            SimTime::new(f64::NAN),
            Err(ConfigError::NonFiniteTime(_))
        ));
        assert!(matches!(
            SimTime::new(f64::INFINITY),
            Err(ConfigError::NonFiniteTime(_))
        ));
        assert!(SimTime::new(8.5).is_ok());
    }

    #[test]
    fn duration_rejects_negative() {
        assert!(matches!(
            SimTime::duration(-1.0),
            Err(ConfigError::NegativeDuration(_))
        ));
        assert!(SimTime::duration(0.0).is_ok());
    }

    #[test]
    fn ordering_is_total() {
        let a = SimTime::from(1.0);
        let b = SimTime::from(2.0);
        assert!(a < b);
        assert_eq!(a.max(b), b);
        assert_eq!(SimTime::ZERO.max(a), a);
    }

    #[test]
    fn arithmetic() {
        let t = SimTime::from(8) + SimTime::from(5);
        assert_eq!(t, SimTime::from(13.0));
        assert_eq!(t.since(SimTime::from(10)), SimTime::from(3.0));
        // `since` clamps instead of going negative
        assert_eq!(SimTime::from(3).since(SimTime::from(10)), SimTime::ZERO);
    }
}

mod id_tests {
    use super::*;

    #[test]
    fn lookup_by_str_without_allocation() {
        let mut map: BTreeMap<OrderId, u32> = BTreeMap::new();
        map.insert(OrderId::from("O-1"), 1);
        assert_eq!(map.get("O-1"), Some(&1));
        assert_eq!(map.get("O-2"), None);
    }

    #[test]
    fn display_is_bare() {
        assert_eq!(LocationId::from("DEPOT").to_string(), "DEPOT");
    }

    #[test]
    fn btreemap_iteration_is_sorted() {
        let mut map: BTreeMap<OrderId, ()> = BTreeMap::new();
        for id in ["O-2", "O-10", "O-1"] {
            map.insert(OrderId::from(id), ());
        }
        let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["O-1", "O-10", "O-2"]);
    }
}
