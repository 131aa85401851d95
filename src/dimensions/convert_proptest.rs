#[cfg(test)]
mod proptest_tests {
    use crate::dimensions::labels::*;
    use crate::dimensions::unit::{scheduling_unit_dimensions, SchedulingUnit};
    use crate::dimensions::{project, revert, DutState, Dimensions, LabelEnum};
    use proptest::prelude::*;

    fn any_label<E: LabelEnum + std::fmt::Debug>() -> impl Strategy<Value = E> {
        prop::sample::select(E::ALL.to_vec())
    }

    fn word() -> impl Strategy<Value = String> {
        prop_oneof![Just(String::new()), "[a-z][a-z0-9_]{0,8}"]
    }

    prop_compose! {
        fn identity()(
            id in word(),
            hostname in word(),
            hwid in word(),
            dut_state in any_label::<DutState>(),
            board in word(),
            model in word(),
            sku in word(),
            brand in word(),
        ) -> DeviceRecord {
            DeviceRecord { id, hostname, hwid, dut_state, board, model, sku, brand, ..Default::default() }
        }
    }

    prop_compose! {
        fn peripherals()(
            carrier in any_label::<Carrier>(),
            chameleon_type in prop::collection::vec(any_label::<ChameleonType>(), 0..4),
            wifi_state in any_label::<HardwareState>(),
            servo_state in any_label::<PeripheralState>(),
            peers in 0u32..6,
        ) -> (Carrier, Peripherals) {
            let peripherals = Peripherals {
                chameleon_type,
                wifi_state,
                servo_state,
                working_bluetooth_btpeer: peers,
                ..Default::default()
            };
            (carrier, peripherals)
        }
    }

    prop_compose! {
        fn record()(
            base in identity(),
            arc in any::<bool>(),
            stable in any::<bool>(),
            phase in any_label::<Phase>(),
            cts_cpu in prop::collection::vec(any_label::<CtsCpu>(), 0..4),
            critical_pools in prop::collection::vec(any_label::<CriticalPool>(), 0..4),
            self_serve_pools in prop::collection::vec("[a-z][a-z-]{0,8}", 0..3),
            (carrier, peripherals) in peripherals(),
            attributes in prop::collection::btree_map(
                "attr-[a-z]{1,6}",
                prop::collection::vec("[a-z]{0,4}", 0..3),
                0..3,
            ),
        ) -> DeviceRecord {
            let mut record = base;
            record.arc = arc;
            record.stable = stable;
            record.phase = phase;
            record.cts_cpu = cts_cpu;
            record.critical_pools = critical_pools;
            record.self_serve_pools = self_serve_pools;
            record.capabilities.carrier = carrier;
            record.peripherals = peripherals;
            record.attributes = attributes;
            record
        }
    }

    proptest! {
        #[test]
        fn project_revert_project_is_stable(record in record()) {
            let projected = project(&record);
            prop_assert_eq!(project(&revert(&projected)), projected);
        }

        #[test]
        fn projection_has_no_empty_values(record in record()) {
            let projected = project(&record);
            for values in projected.values() {
                prop_assert!(!values.is_empty());
                prop_assert!(values.iter().all(|v| !v.is_empty()));
            }
        }

        #[test]
        fn single_value_labels_count_repeats(boards in prop::collection::vec("[a-c]", 0..8)) {
            let children: Vec<Dimensions> = boards
                .iter()
                .map(|b| Dimensions::from([("label-board".to_string(), vec![b.clone()])]))
                .collect();
            let dims = scheduling_unit_dimensions(&SchedulingUnit::default(), &children);
            let emitted = dims.get("label-board").cloned().unwrap_or_default();
            prop_assert_eq!(emitted.len(), boards.len());
            for board in ["a", "b", "c"] {
                let k = boards.iter().filter(|b| b.as_str() == board).count();
                let expected: Vec<String> = (1..=k)
                    .map(|i| if i == 1 { board.to_string() } else { format!("{}_{}", board, i) })
                    .collect();
                let got: Vec<String> = emitted
                    .iter()
                    .filter(|v| v.as_str() == board || v.starts_with(&format!("{}_", board)))
                    .cloned()
                    .collect();
                prop_assert_eq!(got, expected);
            }
        }

        #[test]
        fn single_value_labels_stay_distinct(
            boards in prop::collection::vec("(a|a_2|a_3|b|b_2)", 0..8),
        ) {
            let children: Vec<Dimensions> = boards
                .iter()
                .map(|b| Dimensions::from([("label-board".to_string(), vec![b.clone()])]))
                .collect();
            let dims = scheduling_unit_dimensions(&SchedulingUnit::default(), &children);
            let emitted = dims.get("label-board").cloned().unwrap_or_default();
            prop_assert_eq!(emitted.len(), boards.len());
            let distinct: std::collections::HashSet<&String> = emitted.iter().collect();
            prop_assert_eq!(distinct.len(), emitted.len());
            for (board, value) in boards.iter().zip(&emitted) {
                let prefix = format!("{}_", board);
                prop_assert!(value == board || value.starts_with(&prefix));
            }
        }

        #[test]
        fn conjunction_is_sorted_intersection(
            sets in prop::collection::vec(prop::collection::btree_set("[a-d]", 1..4), 1..4),
        ) {
            let children: Vec<Dimensions> = sets
                .iter()
                .map(|s| Dimensions::from([(
                    "label-device-stable".to_string(),
                    s.iter().cloned().collect::<Vec<_>>(),
                )]))
                .collect();
            let dims = scheduling_unit_dimensions(&SchedulingUnit::default(), &children);
            let expected: Vec<String> = sets[0]
                .iter()
                .filter(|v| sets.iter().all(|s| s.contains(*v)))
                .cloned()
                .collect();
            prop_assert_eq!(
                dims.get("label-device-stable").cloned().unwrap_or_default(),
                expected
            );
        }
    }
}
