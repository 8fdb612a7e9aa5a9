//! Thin client for the Harvest v2 REST API.
//!
//! Only the handful of operations the session needs are exposed, behind
//! the [`TimeApi`] trait so the driver can run against a fake in tests.

use std::fmt;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::billing::Period;
use crate::config::Config;

const BASE_URL: &str = "https://api.harvestapp.com/v2";
const USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));
const PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Harvest API error: {message}")]
    Api { message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct Client {
    pub id: u64,
    pub name: String,
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct Task {
    pub name: String,
}

#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct TimeEntry {
    pub spent_date: String,
    pub rounded_hours: f64,
    pub task: Task,
}

/// One page of time entries. Harvest reports the page count alongside;
/// anything past page one is more than this tool supports.
#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct TimeEntriesPage {
    pub time_entries: Vec<TimeEntry>,
    pub total_pages: u32,
}

#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct Project {
    pub id: u64,
    pub name: String,
}

#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct Invoice {
    pub id: u64,
}

/// Everything needed to create one invoice from tracked time.
#[derive(Debug, PartialEq, Clone)]
pub struct InvoiceDraft {
    pub client_id: u64,
    pub project_id: u64,
    pub subject: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub period: Period,
}

#[allow(async_fn_in_trait)]
pub trait TimeApi {
    async fn list_clients(&self) -> Result<Vec<Client>, ApiError>;

    async fn list_time_entries(
        &self,
        client_id: u64,
        period: &Period,
    ) -> Result<TimeEntriesPage, ApiError>;

    async fn list_projects(
        &self,
        client_id: u64,
    ) -> Result<Vec<Project>, ApiError>;

    async fn create_invoice(
        &self,
        draft: &InvoiceDraft,
    ) -> Result<Invoice, ApiError>;

    async fn send_invoice(&self, invoice_id: u64) -> Result<(), ApiError>;
}

pub struct Harvest {
    http: reqwest::Client,
    base_url: String,
    account_id: String,
    access_token: String,
}

impl fmt::Debug for Harvest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Harvest")
            .field("base_url", &self.base_url)
            .field("account_id", &self.account_id)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Harvest {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: BASE_URL.to_string(),
            account_id: config.account_id.clone(),
            access_token: config.access_token.clone(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        tracing::debug!(path, ?query, "GET");
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .header("Harvest-Account-Id", &self.account_id)
            .query(query)
            .send()
            .await?;
        decode(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        tracing::debug!(path, "POST");
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .header("Harvest-Account-Id", &self.account_id)
            .json(body)
            .send()
            .await?;
        decode(response).await
    }
}

impl TimeApi for Harvest {
    async fn list_clients(&self) -> Result<Vec<Client>, ApiError> {
        #[derive(Deserialize)]
        struct Page {
            clients: Vec<Client>,
        }

        let page: Page = self
            .get("/clients", &[("is_active", "true".to_string())])
            .await?;
        Ok(page.clients)
    }

    async fn list_time_entries(
        &self,
        client_id: u64,
        period: &Period,
    ) -> Result<TimeEntriesPage, ApiError> {
        self.get(
            "/time_entries",
            &[
                ("client_id", client_id.to_string()),
                ("from", period.from.to_string()),
                ("to", period.until.to_string()),
                ("per_page", PAGE_SIZE.to_string()),
            ],
        )
        .await
    }

    async fn list_projects(
        &self,
        client_id: u64,
    ) -> Result<Vec<Project>, ApiError> {
        #[derive(Deserialize)]
        struct Page {
            projects: Vec<Project>,
        }

        let page: Page = self
            .get(
                "/projects",
                &[
                    ("client_id", client_id.to_string()),
                    ("is_active", "true".to_string()),
                ],
            )
            .await?;
        Ok(page.projects)
    }

    async fn create_invoice(
        &self,
        draft: &InvoiceDraft,
    ) -> Result<Invoice, ApiError> {
        self.post("/invoices", &InvoiceRequest::new(draft)).await
    }

    async fn send_invoice(&self, invoice_id: u64) -> Result<(), ApiError> {
        #[derive(Serialize)]
        struct SendMessage {
            event_type: &'static str,
        }

        let _: serde_json::Value = self
            .post(
                &format!("/invoices/{}/messages", invoice_id),
                &SendMessage { event_type: "send" },
            )
            .await?;
        Ok(())
    }
}

#[derive(Serialize, Debug, PartialEq)]
struct InvoiceRequest<'a> {
    client_id: u64,
    subject: &'a str,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    line_items_import: LineItemsImport,
}

#[derive(Serialize, Debug, PartialEq)]
struct LineItemsImport {
    project_ids: Vec<u64>,
    time: TimeImport,
}

#[derive(Serialize, Debug, PartialEq)]
struct TimeImport {
    summary_type: &'static str,
    from: NaiveDate,
    to: NaiveDate,
}

impl<'a> InvoiceRequest<'a> {
    fn new(draft: &'a InvoiceDraft) -> Self {
        Self {
            client_id: draft.client_id,
            subject: &draft.subject,
            issue_date: draft.issue_date,
            due_date: draft.due_date,
            line_items_import: LineItemsImport {
                project_ids: vec![draft.project_id],
                time: TimeImport {
                    summary_type: "detailed",
                    from: draft.period.from,
                    to: draft.period.until,
                },
            },
        }
    }
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(parse_api_error(&body).unwrap_or_else(|| ApiError::Api {
            message: format!("status {}: {}", status, body),
        }));
    }
    serde_json::from_str(&body)
        .map_err(|err| ApiError::InvalidResponse(err.to_string()))
}

fn parse_api_error(body: &str) -> Option<ApiError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error_description: Option<String>,
        message: Option<String>,
    }

    let payload: ErrorPayload = serde_json::from_str(body).ok()?;
    payload
        .error_description
        .or(payload.message)
        .map(|message| ApiError::Api { message })
}
