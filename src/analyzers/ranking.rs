use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::analyzers::types::{CohortRanking, MakeShare};
use crate::record::{AnnotatedComplaint, NormalizedComplaint};

const SECONDS_PER_DAY: i64 = 86_400;

struct Accumulator<'a> {
    latest: &'a AnnotatedComplaint,
    rate_sum: f64,
    rate_samples: usize,
}

/// Ranks make/model/year cohorts by their latest complaint velocity.
///
/// Each cohort is represented by its newest observation. With `window_days`
/// set, only cohorts whose newest complaint falls within that many days of
/// the newest complaint in the whole set are kept; a negative window counts
/// as zero days. Cohorts without a rate sort last; ties break on the cohort
/// key.
pub fn rank_cohorts(
    annotated: &[AnnotatedComplaint],
    window_days: Option<i64>,
) -> Vec<CohortRanking> {
    let Some(newest) = annotated.iter().map(|a| a.fail_epoch).max() else {
        return Vec::new();
    };
    let cutoff = window_days
        .map(|days| newest.saturating_sub(days.max(0).saturating_mul(SECONDS_PER_DAY)));

    let mut cohorts: HashMap<&str, Accumulator<'_>> = HashMap::new();
    for a in annotated {
        let acc = cohorts
            .entry(a.record.keys.make_model_year.as_str())
            .or_insert(Accumulator {
                latest: a,
                rate_sum: 0.0,
                rate_samples: 0,
            });
        if a.fail_epoch >= acc.latest.fail_epoch {
            acc.latest = a;
        }
        if let Some(rate) = a.observation.make_model_year_rate {
            acc.rate_sum += rate;
            acc.rate_samples += 1;
        }
    }

    let mut ranked: Vec<CohortRanking> = cohorts
        .into_iter()
        .filter(|(_, acc)| cutoff.is_none_or(|cutoff| acc.latest.fail_epoch >= cutoff))
        .map(|(key, acc)| {
            let latest = acc.latest;
            CohortRanking {
                make_model_year: key.to_string(),
                make: latest.record.make.clone(),
                model: latest.record.model.clone(),
                model_year: latest.record.model_year,
                total_complaints: latest.observation.make_model_year_cum,
                latest_rate: latest.observation.make_model_year_rate,
                mean_rate: (acc.rate_samples > 0)
                    .then(|| acc.rate_sum / acc.rate_samples as f64),
                last_complaint: DateTime::<Utc>::from_timestamp(latest.fail_epoch, 0)
                    .unwrap_or_default(),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        let a_rate = a.latest_rate.unwrap_or(f64::NEG_INFINITY);
        let b_rate = b.latest_rate.unwrap_or(f64::NEG_INFINITY);
        b_rate
            .total_cmp(&a_rate)
            .then_with(|| a.make_model_year.cmp(&b.make_model_year))
    });
    ranked
}

/// Sums complaint counts per make, ordered by make.
pub fn complaints_by_make(records: &[NormalizedComplaint]) -> Vec<MakeShare> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for r in records {
        *totals.entry(r.make.as_str()).or_default() += u64::from(r.count);
    }
    totals
        .into_iter()
        .map(|(make, complaints)| MakeShare {
            make: make.to_string(),
            complaints,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::CohortKeys;
    use crate::record::{CohortObservation, RawComplaint};

    fn normalized(make: &str, model: &str, year: i32) -> NormalizedComplaint {
        NormalizedComplaint {
            raw: RawComplaint::new(Vec::new()),
            make: make.to_string(),
            model: model.to_string(),
            model_year: Some(year),
            fail_date: None,
            fail_epoch: None,
            keys: CohortKeys::build(make, model, &year.to_string()),
            count: 1,
        }
    }

    fn annotated(
        make: &str,
        model: &str,
        year: i32,
        epoch: i64,
        cum: u64,
        rate: Option<f64>,
    ) -> AnnotatedComplaint {
        AnnotatedComplaint {
            record: normalized(make, model, year),
            fail_epoch: epoch,
            observation: CohortObservation {
                make_model_cum: cum,
                make_model_rate: 1.0,
                make_model_year_cum: cum,
                make_model_year_rate: rate,
            },
        }
    }

    #[test]
    fn test_rank_uses_latest_observation() {
        let rows = vec![
            annotated("FORD", "FOCUS", 2016, 100, 1, Some(4.0)),
            annotated("KIA", "SOUL", 2015, 150, 1, Some(3.0)),
            annotated("FORD", "FOCUS", 2016, 200, 2, Some(2.0)),
        ];
        let ranked = rank_cohorts(&rows, None);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].make_model_year, "KIA SOUL 2015");
        assert_eq!(ranked[1].make_model_year, "FORD FOCUS 2016");
        assert_eq!(ranked[1].total_complaints, 2);
        assert_eq!(ranked[1].latest_rate, Some(2.0));
        assert_eq!(ranked[1].mean_rate, Some(3.0));
        assert_eq!(ranked[1].last_complaint.timestamp(), 200);
    }

    #[test]
    fn test_rank_window_drops_stale_cohorts() {
        let day = SECONDS_PER_DAY;
        let rows = vec![
            annotated("FORD", "FOCUS", 2016, 0, 1, Some(9.0)),
            annotated("KIA", "SOUL", 2015, 300 * day, 1, Some(1.0)),
            annotated("MAZDA", "CX-5", 2017, 200 * day, 1, Some(2.0)),
        ];
        let ranked = rank_cohorts(&rows, Some(182));

        let keys: Vec<&str> = ranked.iter().map(|r| r.make_model_year.as_str()).collect();
        assert_eq!(keys, vec!["MAZDA CX-5 2017", "KIA SOUL 2015"]);
    }

    #[test]
    fn test_rank_missing_rates_sort_last() {
        let rows = vec![
            annotated("A", "X", 2016, 10, 1, None),
            annotated("B", "Y", 2016, 10, 1, Some(0.5)),
        ];
        let ranked = rank_cohorts(&rows, None);

        assert_eq!(ranked[0].make_model_year, "B Y 2016");
        assert_eq!(ranked[1].mean_rate, None);
    }

    #[test]
    fn test_rank_window_extremes() {
        let day = SECONDS_PER_DAY;
        let rows = vec![
            annotated("FORD", "FOCUS", 2016, -400 * day, 1, Some(9.0)),
            annotated("KIA", "SOUL", 2015, 300 * day, 1, Some(1.0)),
        ];

        assert_eq!(rank_cohorts(&rows, Some(i64::MAX)).len(), 2);

        let newest_only = rank_cohorts(&rows, Some(-5));
        assert_eq!(newest_only.len(), 1);
        assert_eq!(newest_only[0].make_model_year, "KIA SOUL 2015");
        assert_eq!(rank_cohorts(&rows, Some(0)), newest_only);
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank_cohorts(&[], Some(30)).is_empty());
    }

    #[test]
    fn test_complaints_by_make() {
        let records = vec![
            normalized("TOYOTA", "CAMRY", 2018),
            normalized("FORD", "FOCUS", 2016),
            normalized("TOYOTA", "PRIUS", 2012),
        ];
        let shares = complaints_by_make(&records);

        assert_eq!(
            shares,
            vec![
                MakeShare {
                    make: "FORD".to_string(),
                    complaints: 1
                },
                MakeShare {
                    make: "TOYOTA".to_string(),
                    complaints: 2
                },
            ]
        );
    }
}
