use crate::filtering::RecordPredicate;
use crate::stores::{StoreError, WeatherStore};
use log::{info, warn};
use polars::prelude::DataFrame;
use serde::Serialize;

/// Weather records returned for one query, at most `row_cap` rows.
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub frame: DataFrame,
    pub row_cap: usize,
    /// More rows matched than the cap allowed; `frame` holds the first `row_cap`.
    pub truncated: bool,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            rows: self.len(),
            row_cap: self.row_cap,
            truncated: self.truncated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResultSummary {
    pub rows: usize,
    pub row_cap: usize,
    pub truncated: bool,
}

/// Runs a weather query with the row cap pushed into the store read.
///
/// One row beyond the cap is requested so truncation is known exactly: the flag is set
/// only if more rows matched than fit, and the extra row is dropped before returning.
pub async fn fetch_capped<S>(
    store: &S,
    predicate: &RecordPredicate,
    row_cap: usize,
) -> Result<ResultSet, StoreError>
where
    S: WeatherStore + Sync,
{
    let frame = store
        .get_weather(predicate, row_cap.saturating_add(1))
        .await?;

    let truncated = frame.height() > row_cap;
    let frame = if truncated {
        warn!(
            "Query matched more than {} records, result truncated. Narrow the filters to see all data",
            row_cap
        );
        frame.head(Some(row_cap))
    } else {
        info!("Query returned {} records", frame.height());
        frame
    };

    Ok(ResultSet {
        frame,
        row_cap,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::records_to_frame;
    use crate::stores::columnar::tests::fixture_records;
    use crate::stores::ColumnarStore;

    fn store() -> ColumnarStore {
        ColumnarStore::from_frame(vec![], vec![], records_to_frame(&fixture_records()).unwrap())
    }

    #[tokio::test]
    async fn test_truncation_flag_is_exact() -> Result<(), Box<dyn std::error::Error>> {
        let store = store();
        let total = fixture_records().len();

        let exact = fetch_capped(&store, &RecordPredicate::all(), total).await?;
        assert_eq!(exact.len(), total);
        assert!(!exact.truncated);

        let capped = fetch_capped(&store, &RecordPredicate::all(), total - 1).await?;
        assert_eq!(capped.len(), total - 1);
        assert!(capped.truncated);

        let roomy = fetch_capped(&store, &RecordPredicate::all(), total * 2).await?;
        assert_eq!(roomy.len(), total);
        assert!(!roomy.truncated);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_cap() -> Result<(), Box<dyn std::error::Error>> {
        let result = fetch_capped(&store(), &RecordPredicate::all(), 0).await?;
        assert!(result.is_empty());
        assert!(result.truncated);
        assert_eq!(
            result.summary(),
            ResultSummary {
                rows: 0,
                row_cap: 0,
                truncated: true
            }
        );
        Ok(())
    }
}
