use common_types::{Comment, Event, Submission};

/// Deterministic split of one tick's batch by record kind. Every event lands
/// in exactly one partition, in arrival order.
pub fn partition_events(events: Vec<Event>) -> (Vec<Submission>, Vec<Comment>) {
    let mut submissions = Vec::new();
    let mut comments = Vec::new();
    for event in events {
        match event {
            Event::Submission(submission) => submissions.push(submission),
            Event::Comment(comment) => comments.push(comment),
        }
    }
    (submissions, comments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn submission_event(id: &str) -> Event {
        Event::Submission(Submission {
            id: id.to_string(),
            title: "title".to_string(),
            created_at: Utc::now(),
            topic: None,
        })
    }

    fn comment_event(id: &str) -> Event {
        Event::Comment(Comment {
            id: id.to_string(),
            submission_id: "s1".to_string(),
            author: "someone".to_string(),
            text: "text".to_string(),
            created_at: Utc::now(),
            sentiment_score: None,
            sentiment_magnitude: None,
        })
    }

    #[test]
    fn partitions_cover_the_whole_batch() {
        let batch = vec![
            comment_event("c1"),
            submission_event("s1"),
            comment_event("c2"),
            comment_event("c3"),
            submission_event("s2"),
        ];
        let total = batch.len();

        let (submissions, comments) = partition_events(batch);
        assert_eq!(submissions.len() + comments.len(), total);
        assert_eq!(submissions.len(), 2);
        assert_eq!(comments.len(), 3);
    }

    #[test]
    fn partitioning_preserves_arrival_order() {
        let batch = vec![
            comment_event("c1"),
            comment_event("c2"),
            submission_event("s1"),
            comment_event("c3"),
        ];
        let (submissions, comments) = partition_events(batch);

        let comment_ids: Vec<_> = comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(comment_ids, ["c1", "c2", "c3"]);
        assert_eq!(submissions[0].id, "s1");
    }

    #[test]
    fn empty_batch_is_a_valid_no_op() {
        let (submissions, comments) = partition_events(vec![]);
        assert!(submissions.is_empty());
        assert!(comments.is_empty());
    }
}
