use dealsignal_common::{Evidence, EvidencePool, Query, SearchHit};

/// What one query worker hands back to the orchestrator.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Position of the query in the plan.
    pub query_index: usize,
    pub query: Query,
    pub hits: Vec<SearchHit>,
}

/// Merge worker results into one pool ordered by plan position, whatever
/// order the workers finished in. Nothing is filtered.
pub fn aggregate(mut results: Vec<QueryResult>) -> EvidencePool {
    results.sort_by_key(|r| r.query_index);

    let items = results
        .into_iter()
        .flat_map(|r| {
            let query_index = r.query_index;
            let text = r.query.text;
            r.hits
                .into_iter()
                .enumerate()
                .map(move |(position, hit)| Evidence {
                    query_index,
                    query: text.clone(),
                    position,
                    hit,
                })
        })
        .collect();

    EvidencePool::new(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::hit;
    use dealsignal_common::StrategyKind;

    fn result(index: usize, urls: &[&str]) -> QueryResult {
        QueryResult {
            query_index: index,
            query: Query::new(&format!("query {index}"), StrategyKind::Talent, 0, 200).unwrap(),
            hits: urls
                .iter()
                .map(|u| hit("Acme startup", u, "", StrategyKind::Talent))
                .collect(),
        }
    }

    #[test]
    fn orders_by_plan_position_not_arrival() {
        let pool = aggregate(vec![
            result(2, &["https://c.com"]),
            result(0, &["https://a.com", "https://b.com"]),
            result(1, &[]),
        ]);

        let urls: Vec<_> = pool.iter().map(|e| e.hit.url.as_str()).collect();
        assert_eq!(urls, ["https://a.com", "https://b.com", "https://c.com"]);

        let second = pool.iter().nth(1).unwrap();
        assert_eq!(second.query, "query 0");
        assert_eq!(second.position, 1);
    }

    #[test]
    fn keeps_duplicate_hits() {
        let pool = aggregate(vec![
            result(0, &["https://a.com"]),
            result(1, &["https://a.com"]),
        ]);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn empty_input_gives_empty_pool() {
        assert!(aggregate(Vec::new()).is_empty());
    }
}
