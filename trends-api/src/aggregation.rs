use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use common_store::{EventStore, StoreError};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DistributionCounts {
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RollingPoint {
    pub timestamp: DateTime<Utc>,
    pub mean_score: f64,
    pub mean_magnitude: f64,
}

/// Per-topic sentiment distribution over everything persisted so far.
/// A comment counts as negative below zero, positive above zero and neutral
/// at exactly zero. Comments that were never enriched, or whose submission
/// is unknown or has no topic, are left out.
pub async fn sentiment_distribution(
    store: &dyn EventStore,
) -> Result<HashMap<i32, DistributionCounts>, StoreError> {
    let submissions = store.submissions().await?;
    let comments = store.comments().await?;

    let topics: HashMap<&str, i32> = submissions
        .iter()
        .filter_map(|s| s.topic.map(|topic| (s.id.as_str(), topic)))
        .collect();

    let mut distribution: HashMap<i32, DistributionCounts> = HashMap::new();
    for comment in &comments {
        let Some(score) = comment.sentiment_score else {
            continue;
        };
        let Some(topic) = topics.get(comment.submission_id.as_str()) else {
            continue;
        };

        let counts = distribution.entry(*topic).or_default();
        if score < 0.0 {
            counts.negative += 1;
        } else if score > 0.0 {
            counts.positive += 1;
        } else {
            counts.neutral += 1;
        }
    }

    Ok(distribution)
}

/// Trailing rolling mean of sentiment for one topic: for every comment at
/// time `t`, the mean score and magnitude over all of the topic's comments
/// inside `[t - window, t]`. Inclusion is strictly by elapsed time, never by
/// point count.
pub async fn rolling_mean(
    store: &dyn EventStore,
    topic: i32,
    window: Duration,
) -> Result<Vec<RollingPoint>, StoreError> {
    let submissions = store.submissions().await?;
    let comments = store.comments().await?;

    let in_topic: HashSet<&str> = submissions
        .iter()
        .filter(|s| s.topic == Some(topic))
        .map(|s| s.id.as_str())
        .collect();

    let mut points: Vec<(DateTime<Utc>, f64, f64)> = comments
        .iter()
        .filter(|c| in_topic.contains(c.submission_id.as_str()))
        .filter_map(|c| match (c.sentiment_score, c.sentiment_magnitude) {
            (Some(score), Some(magnitude)) => Some((c.created_at, score, magnitude)),
            _ => None,
        })
        .collect();
    points.sort_by_key(|(timestamp, _, _)| *timestamp);

    let mut means = Vec::with_capacity(points.len());
    let mut start = 0usize;
    let mut score_sum = 0.0;
    let mut magnitude_sum = 0.0;

    for (end, &(timestamp, score, magnitude)) in points.iter().enumerate() {
        score_sum += score;
        magnitude_sum += magnitude;

        // Slide the window's trailing edge: points older than t - window fall out
        while points[start].0 < timestamp - window {
            score_sum -= points[start].1;
            magnitude_sum -= points[start].2;
            start += 1;
        }

        let n = (end - start + 1) as f64;
        means.push(RollingPoint {
            timestamp,
            mean_score: score_sum / n,
            mean_magnitude: magnitude_sum / n,
        });
    }

    Ok(means)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use common_store::MemoryStore;
    use common_types::{Comment, Submission};

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn submission(id: &str, topic: Option<i32>) -> Submission {
        Submission {
            id: id.to_string(),
            title: "title".to_string(),
            created_at: at(0),
            topic,
        }
    }

    fn comment(id: &str, submission_id: &str, score: Option<f64>, secs: i64) -> Comment {
        Comment {
            id: id.to_string(),
            submission_id: submission_id.to_string(),
            author: "someone".to_string(),
            text: "text".to_string(),
            created_at: at(secs),
            sentiment_score: score,
            sentiment_magnitude: score.map(f64::abs),
        }
    }

    async fn seeded_store(submissions: &[Submission], comments: &[Comment]) -> MemoryStore {
        let store = MemoryStore::new();
        store.append_submissions(submissions).await.unwrap();
        store.append_comments(comments).await.unwrap();
        store
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[tokio::test]
    async fn distribution_classifies_by_sign() {
        let store = seeded_store(
            &[submission("s1", Some(4)), submission("s2", Some(4))],
            &[
                comment("c1", "s1", Some(-0.5), 0),
                comment("c2", "s1", Some(-0.2), 1),
                comment("c3", "s2", Some(0.0), 2),
                comment("c4", "s2", Some(0.3), 3),
                comment("c5", "s2", Some(0.6), 4),
            ],
        )
        .await;

        let distribution = sentiment_distribution(&store).await.unwrap();
        assert_eq!(
            distribution[&4],
            DistributionCounts {
                positive: 2,
                negative: 2,
                neutral: 1,
            }
        );
    }

    #[tokio::test]
    async fn distribution_counts_sum_to_enriched_comments_per_topic() {
        let store = seeded_store(
            &[submission("s1", Some(1)), submission("s2", Some(2))],
            &[
                comment("c1", "s1", Some(0.9), 0),
                comment("c2", "s1", None, 1), // never enriched
                comment("c3", "s2", Some(-0.1), 2),
                comment("c4", "s2", Some(0.2), 3),
            ],
        )
        .await;

        let distribution = sentiment_distribution(&store).await.unwrap();
        let totals: HashMap<i32, u64> = distribution
            .iter()
            .map(|(topic, c)| (*topic, c.positive + c.negative + c.neutral))
            .collect();
        assert_eq!(totals[&1], 1);
        assert_eq!(totals[&2], 2);
    }

    #[tokio::test]
    async fn distribution_excludes_unresolvable_and_untopiced_comments() {
        let store = seeded_store(
            &[submission("s1", Some(1)), submission("s2", None)],
            &[
                comment("c1", "s1", Some(0.5), 0),
                comment("c2", "s2", Some(0.5), 1),      // submission has no topic
                comment("c3", "missing", Some(0.5), 2), // no such submission
            ],
        )
        .await;

        let distribution = sentiment_distribution(&store).await.unwrap();
        assert_eq!(distribution.len(), 1);
        assert_eq!(
            distribution[&1],
            DistributionCounts {
                positive: 1,
                negative: 0,
                neutral: 0,
            }
        );
    }

    #[tokio::test]
    async fn rolling_mean_uses_a_trailing_time_window() {
        // scores at t=0, 10, 20 with a 15s window: the t=20 point only sees
        // t=10 and t=20, because t=0 is outside [5, 20]
        let store = seeded_store(
            &[submission("s1", Some(7))],
            &[
                comment("c1", "s1", Some(0.5), 0),
                comment("c2", "s1", Some(-0.5), 10),
                comment("c3", "s1", Some(0.2), 20),
            ],
        )
        .await;

        let means = rolling_mean(&store, 7, Duration::seconds(15)).await.unwrap();
        assert_eq!(means.len(), 3);
        assert!(close(means[0].mean_score, 0.5));
        assert!(close(means[1].mean_score, 0.0)); // (0.5 - 0.5) / 2
        assert!(close(means[2].mean_score, -0.15)); // (-0.5 + 0.2) / 2
    }

    #[tokio::test]
    async fn a_single_point_is_its_own_mean() {
        let store = seeded_store(
            &[submission("s1", Some(7))],
            &[comment("c1", "s1", Some(-0.3), 0)],
        )
        .await;

        let means = rolling_mean(&store, 7, Duration::seconds(15)).await.unwrap();
        assert_eq!(means.len(), 1);
        assert!(close(means[0].mean_score, -0.3));
        assert!(close(means[0].mean_magnitude, 0.3));
    }

    #[tokio::test]
    async fn window_boundary_is_inclusive() {
        // a point exactly window-width older still counts
        let store = seeded_store(
            &[submission("s1", Some(7))],
            &[
                comment("c1", "s1", Some(0.4), 0),
                comment("c2", "s1", Some(0.0), 15),
            ],
        )
        .await;

        let means = rolling_mean(&store, 7, Duration::seconds(15)).await.unwrap();
        assert!(close(means[1].mean_score, 0.2));
    }

    #[tokio::test]
    async fn rolling_mean_is_ordered_and_scoped_to_the_topic() {
        let store = seeded_store(
            &[submission("s1", Some(7)), submission("s2", Some(8))],
            &[
                comment("c3", "s1", Some(0.3), 30),
                comment("c1", "s1", Some(0.1), 10),
                comment("other", "s2", Some(-0.9), 15),
                comment("c2", "s1", None, 20), // unenriched, excluded
            ],
        )
        .await;

        let means = rolling_mean(&store, 7, Duration::seconds(100)).await.unwrap();
        let timestamps: Vec<_> = means.iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![at(10), at(30)]);
        assert!(close(means[1].mean_score, 0.2)); // (0.1 + 0.3) / 2, s2 untouched
    }
}
