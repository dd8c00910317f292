use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::analyzers::types::DemographicData;
use crate::models::CollectedResponse;
use crate::services::UserDirectory;

/// Distinct identified respondents in the pool, sorted.
pub fn distinct_respondents(pool: &[CollectedResponse]) -> BTreeSet<&str> {
    pool.iter()
        .filter_map(|item| item.response.respondent_id.as_deref())
        .collect()
}

/// Builds the role histogram for every identified respondent.
///
/// Failed lookups are counted in `unresolved` and do not abort the aggregation.
pub async fn aggregate_demographics(
    users: &dyn UserDirectory,
    pool: &[CollectedResponse],
) -> DemographicData {
    let respondents = distinct_respondents(pool);
    let mut roles: BTreeMap<String, usize> = BTreeMap::new();
    let mut unresolved = 0usize;

    for respondent in &respondents {
        match users.get_user(respondent).await {
            Ok(user) => *roles.entry(user.role).or_insert(0) += 1,
            Err(e) => {
                warn!(respondent_id = %respondent, error = %e, "Skipping unresolved respondent");
                unresolved += 1;
            }
        }
    }

    DemographicData {
        roles,
        total_participants: respondents.len(),
        unresolved,
    }
}
