use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};
use time::Date;

use crate::metrics::DerivedMetricsRecord;
use crate::utils::time::format_date;

pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdView {
    pub threshold_seconds: f64,
    pub records: Vec<DerivedMetricsRecord>,
    pub count: usize,
    pub total: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStats {
    pub channel: String,
    pub mean_delay_seconds: Option<f64>,
    pub median_delay_seconds: Option<f64>,
    pub count: usize,
    pub contacts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    #[serde(serialize_with = "serialize_date")]
    pub date: Date,
    pub agentinteractionduration_seconds: i64,
    pub contactduration_seconds: f64,
    pub contacts: usize,
    pub mean_delay_seconds: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DelaySummary {
    pub records: usize,
    pub unique_contacts: usize,
    pub delay_count: usize,
    pub mean_seconds: Option<f64>,
    pub median_seconds: Option<f64>,
    pub min_seconds: Option<f64>,
    pub max_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower_seconds: f64,
    pub upper_seconds: f64,
    pub count: usize,
}

fn serialize_date<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_date(*date))
}

#[must_use]
pub fn threshold_filter(records: &[DerivedMetricsRecord], threshold_seconds: f64) -> ThresholdView {
    let selected = records
        .iter()
        .filter(|record| {
            record
                .delay_seconds
                .is_some_and(|delay| delay > threshold_seconds)
        })
        .cloned()
        .collect::<Vec<_>>();
    let count = selected.len();
    let total = records.len();
    let percentage = if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    };

    ThresholdView {
        threshold_seconds,
        records: selected,
        count,
        total,
        percentage,
    }
}

#[must_use]
pub fn channel_aggregate(records: &[DerivedMetricsRecord]) -> Vec<ChannelStats> {
    let mut groups = BTreeMap::<&str, (Vec<f64>, usize)>::new();
    for record in records {
        let Some(channel) = record.channel.as_deref() else {
            continue;
        };
        let (delays, contacts) = groups.entry(channel).or_default();
        *contacts += 1;
        if let Some(delay) = record.delay_seconds {
            delays.push(delay);
        }
    }

    groups
        .into_iter()
        .map(|(channel, (mut delays, contacts))| ChannelStats {
            channel: channel.to_string(),
            mean_delay_seconds: mean(&delays),
            median_delay_seconds: median(&mut delays),
            count: delays.len(),
            contacts,
        })
        .collect()
}

#[must_use]
pub fn daily_aggregate(records: &[DerivedMetricsRecord]) -> Vec<DailyStats> {
    #[derive(Default)]
    struct DayAccumulator {
        agent_interaction: i64,
        contact_duration: f64,
        contacts: usize,
        delays: Vec<f64>,
    }

    let mut days = BTreeMap::<Date, DayAccumulator>::new();
    for record in records {
        let Some(date) = record.date else {
            continue;
        };
        let day = days.entry(date).or_default();
        day.contacts += 1;
        day.agent_interaction += record.agentinteractionduration_seconds.unwrap_or(0);
        day.contact_duration += record.contactduration_seconds.unwrap_or(0.0);
        if let Some(delay) = record.delay_seconds {
            day.delays.push(delay);
        }
    }

    days.into_iter()
        .map(|(date, day)| DailyStats {
            date,
            agentinteractionduration_seconds: day.agent_interaction,
            contactduration_seconds: day.contact_duration,
            contacts: day.contacts,
            mean_delay_seconds: mean(&day.delays),
        })
        .collect()
}

#[must_use]
pub fn delay_summary(records: &[DerivedMetricsRecord]) -> DelaySummary {
    let mut delays = records
        .iter()
        .filter_map(|record| record.delay_seconds)
        .collect::<Vec<_>>();
    let unique_contacts = records
        .iter()
        .filter_map(|record| record.contactid.as_deref())
        .collect::<BTreeSet<_>>()
        .len();

    DelaySummary {
        records: records.len(),
        unique_contacts,
        delay_count: delays.len(),
        mean_seconds: mean(&delays),
        median_seconds: median(&mut delays),
        min_seconds: delays.iter().copied().reduce(f64::min),
        max_seconds: delays.iter().copied().reduce(f64::max),
    }
}

#[must_use]
pub fn delay_histogram(records: &[DerivedMetricsRecord], max_bins: usize) -> Vec<HistogramBin> {
    let delays = records
        .iter()
        .filter_map(|record| record.delay_seconds)
        .filter(|delay| delay.is_finite())
        .collect::<Vec<_>>();
    let (Some(min), Some(max)) = (
        delays.iter().copied().reduce(f64::min),
        delays.iter().copied().reduce(f64::max),
    ) else {
        return Vec::new();
    };

    if max_bins == 0 {
        return Vec::new();
    }
    if max == min {
        return vec![HistogramBin {
            lower_seconds: min,
            upper_seconds: max,
            count: delays.len(),
        }];
    }

    let width = (max - min) / max_bins as f64;
    let mut bins = (0..max_bins)
        .map(|index| HistogramBin {
            lower_seconds: min + width * index as f64,
            upper_seconds: if index + 1 == max_bins {
                max
            } else {
                min + width * (index + 1) as f64
            },
            count: 0,
        })
        .collect::<Vec<_>>();
    for delay in delays {
        let index = (((delay - min) / width) as usize).min(max_bins - 1);
        bins[index].count += 1;
    }
    bins
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let middle = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[middle - 1] + values[middle]) / 2.0)
    } else {
        Some(values[middle])
    }
}
