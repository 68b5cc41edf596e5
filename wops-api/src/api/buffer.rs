//! POST /api/buffer
//!
//! Single endpoint for the draft roster; the `action` field selects the
//! operation. A missing or unknown action is rejected with 400 before the
//! store is touched.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use wops_common::records::BufferEntry;

use super::reply::Reply;
use crate::error::ApiResult;
use crate::services::{AddOutcome, Candidate, CommitTuple};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum BufferAction {
    #[serde(rename_all = "camelCase")]
    List {
        supervisor: String,
        #[serde(default)]
        group: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Add {
        supervisor: String,
        #[serde(default)]
        group: String,
        employee_id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        role: String,
    },
    #[serde(rename_all = "camelCase")]
    Remove {
        supervisor: String,
        employee_id: String,
    },
    #[serde(rename_all = "camelCase")]
    RemoveByGroup {
        group: String,
        employee_id: String,
    },
    #[serde(rename_all = "camelCase")]
    SetStatus {
        supervisor: String,
        employee_id: String,
        status: String,
    },
    #[serde(rename_all = "camelCase")]
    SetDeviation {
        supervisor: String,
        employee_id: String,
        #[serde(default)]
        deviation: String,
    },
    Commit {
        #[serde(alias = "rows")]
        batch: Vec<CommitTuple>,
    },
}

#[derive(Debug, Serialize)]
struct EntryList {
    entries: Vec<BufferEntry>,
}

#[derive(Debug, Serialize)]
struct AddResult {
    result: AddOutcome,
}

pub async fn buffer_action(
    State(state): State<AppState>,
    payload: Result<Json<BufferAction>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(action) = payload?;
    let roster = &state.roster;

    let response = match action {
        BufferAction::List { supervisor, group } => {
            let entries = roster.list(&supervisor, group.as_deref()).await?;
            Reply::ok(EntryList { entries }).into_response()
        }
        BufferAction::Add {
            supervisor,
            group,
            employee_id,
            name,
            role,
        } => {
            let candidate = Candidate {
                employee_id,
                name,
                role,
            };
            let result = roster.add_if_absent(&supervisor, &group, &candidate).await?;
            let msg = match result {
                AddOutcome::Added => "Added to buffer",
                AddOutcome::AlreadyPresent => "Already in buffer",
            };
            Reply::ok(AddResult { result }).with_msg(msg).into_response()
        }
        BufferAction::Remove {
            supervisor,
            employee_id,
        } => {
            let outcome = roster.remove(&supervisor, &employee_id).await?;
            Reply::from_outcome(outcome, "Removed", "Entry not found").into_response()
        }
        BufferAction::RemoveByGroup { group, employee_id } => {
            let outcome = roster.remove_by_group(&group, &employee_id).await?;
            Reply::from_outcome(outcome, "Removed", "Entry not found").into_response()
        }
        BufferAction::SetStatus {
            supervisor,
            employee_id,
            status,
        } => {
            let outcome = roster.set_status(&supervisor, &employee_id, &status).await?;
            Reply::from_outcome(outcome, "Status saved", "Entry not found").into_response()
        }
        BufferAction::SetDeviation {
            supervisor,
            employee_id,
            deviation,
        } => {
            let outcome = roster
                .set_deviation(&supervisor, &employee_id, &deviation)
                .await?;
            Reply::from_outcome(outcome, "Deviation saved", "Entry not found").into_response()
        }
        BufferAction::Commit { batch } => {
            let report = roster.commit_to_base(&batch).await?;
            Reply::ok(report).with_msg("Committed").into_response()
        }
    };

    Ok(response)
}

pub fn buffer_routes() -> Router<AppState> {
    Router::new().route("/api/buffer", post(buffer_action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parsing() {
        let action: BufferAction = serde_json::from_str(
            r#"{"action":"removeByGroup","group":"G1","employeeId":"17"}"#,
        )
        .unwrap();
        assert!(matches!(action, BufferAction::RemoveByGroup { ref group, .. } if group == "G1"));

        let action: BufferAction = serde_json::from_str(
            r#"{"action":"commit","rows":[["Ana","G1","17","Joao","Conferente","Presente"]]}"#,
        )
        .unwrap();
        assert!(matches!(action, BufferAction::Commit { ref batch } if batch.len() == 1));
    }

    #[test]
    fn test_missing_or_unknown_action_rejected() {
        assert!(serde_json::from_str::<BufferAction>(r#"{"supervisor":"Ana"}"#).is_err());
        assert!(serde_json::from_str::<BufferAction>(r#"{"action":"purge"}"#).is_err());
    }
}
