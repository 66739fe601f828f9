//! Closed pull request query for the GitHub GraphQL API.

use super::{PullRequestPage, PullRequestRecord};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of pull requests requested per page.
pub const PULL_REQUEST_PAGE_SIZE: u32 = 20;

/// Query listing closed pull requests, most recently updated first.
pub const CLOSED_PULL_REQUESTS_QUERY: &str = r"
query ClosedPullRequests($owner: String!, $name: String!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    pullRequests(
      states: CLOSED,
      first: $first,
      after: $after,
      orderBy: { direction: DESC, field: UPDATED_AT }
    ) {
      totalCount
      nodes {
        ... on PullRequest {
          title
          url
          updatedAt
          headRef {
            name
          }
          headRefName
        }
      }
      pageInfo {
        hasNextPage
        endCursor
      }
    }
  }
}
";

/// GraphQL request body.
#[derive(Debug, Serialize)]
pub(super) struct GraphQlRequest<'a> {
    query: &'static str,
    variables: Variables<'a>,
}

#[derive(Debug, Serialize)]
struct Variables<'a> {
    owner: &'a str,
    name: &'a str,
    first: u32,
    after: Option<&'a str>,
}

impl<'a> GraphQlRequest<'a> {
    /// Builds the closed pull request query for one page.
    pub(super) const fn closed_pull_requests(
        owner: &'a str,
        name: &'a str,
        after: Option<&'a str>,
    ) -> Self {
        Self {
            query: CLOSED_PULL_REQUESTS_QUERY,
            variables: Variables {
                owner,
                name,
                first: PULL_REQUEST_PAGE_SIZE,
                after,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ResponseData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    repository: Option<Repository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Repository {
    pull_requests: PullRequestConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestConnection {
    #[serde(default)]
    nodes: Vec<Option<PullRequestNode>>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    #[serde(default)]
    title: String,
    url: String,
    updated_at: DateTime<Utc>,
    head_ref: Option<HeadRef>,
    head_ref_name: String,
}

#[derive(Debug, Deserialize)]
struct HeadRef {
    name: String,
}

/// Parses a GraphQL response body into a page.
///
/// A body without `data` is an error, even if it is valid JSON, so that the
/// caller can retry it.
pub(super) fn parse_page(body: &str) -> Result<PullRequestPage> {
    let response: GraphQlResponse =
        serde_json::from_str(body).map_err(|e| Error::OperationFailed {
            operation: "parse_graphql_response".to_string(),
            cause: e.to_string(),
        })?;

    let Some(data) = response.data else {
        let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        return Err(Error::OperationFailed {
            operation: "graphql_closed_pull_requests".to_string(),
            cause: format!("response has no data: {}", messages.join("; ")),
        });
    };
    let repository = data.repository.ok_or_else(|| Error::OperationFailed {
        operation: "graphql_closed_pull_requests".to_string(),
        cause: "repository not found".to_string(),
    })?;

    let connection = repository.pull_requests;
    let records = connection
        .nodes
        .into_iter()
        .flatten()
        .map(|node| PullRequestRecord {
            title: node.title,
            url: node.url,
            updated_at: node.updated_at,
            head_ref_name: node.head_ref_name,
            head_ref: node.head_ref.map(|head| head.name),
        })
        .collect();

    Ok(PullRequestPage {
        records,
        end_cursor: connection.page_info.end_cursor,
        has_next_page: connection.page_info.has_next_page,
    })
}
