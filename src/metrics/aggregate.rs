use crate::metrics::MetricKey;
use crate::types::StatRecord;

/// Sum per-season records into one composite record.
///
/// Returns `None` for an empty slice. Each metric's values are summed in
/// sorted order so the result is identical for any permutation of the
/// input, even for fractional points.
pub fn aggregate(records: &[StatRecord]) -> Option<StatRecord> {
    match records {
        [] => None,
        [single] => Some(*single),
        _ => {
            let mut total = StatRecord::default();
            let mut values: Vec<f64> = Vec::with_capacity(records.len());
            for key in MetricKey::ALL {
                values.clear();
                values.extend(records.iter().map(|r| r.get(key)));
                values.sort_by(f64::total_cmp);
                total.set(key, values.iter().sum());
            }
            Some(total)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn season(wins: f64, points: f64, dnfs: f64) -> StatRecord {
        StatRecord {
            wins,
            podiums: wins * 2.0,
            poles: 1.0,
            fastest_laps: 0.0,
            points,
            dnfs,
            races: 22.0,
        }
    }

    #[test]
    fn empty_input_has_no_aggregate() {
        assert_eq!(aggregate(&[]), None);
    }

    #[test]
    fn single_season_is_returned_unchanged() {
        let record = season(11.0, 395.5, 2.0);
        assert_eq!(aggregate(&[record]), Some(record));
    }

    #[test]
    fn sums_every_metric() {
        let total = aggregate(&[season(10.0, 300.0, 1.0), season(5.0, 150.5, 3.0)]).unwrap();
        assert_eq!(total.wins, 15.0);
        assert_eq!(total.podiums, 30.0);
        assert_eq!(total.poles, 2.0);
        assert_eq!(total.points, 450.5);
        assert_eq!(total.dnfs, 4.0);
        assert_eq!(total.races, 44.0);
    }

    fn arb_record() -> impl Strategy<Value = StatRecord> {
        prop::array::uniform7(0.0f64..1000.0).prop_map(|v| StatRecord {
            wins: v[0],
            podiums: v[1],
            poles: v[2],
            fastest_laps: v[3],
            points: v[4],
            dnfs: v[5],
            races: v[6],
        })
    }

    proptest! {
        #[test]
        fn aggregate_is_order_independent(
            records in prop::collection::vec(arb_record(), 1..8),
            rotate in 0usize..8,
        ) {
            let mut permuted = records.clone();
            permuted.reverse();
            let len = permuted.len();
            permuted.rotate_left(rotate % len);
            prop_assert_eq!(aggregate(&records), aggregate(&permuted));
        }
    }
}
