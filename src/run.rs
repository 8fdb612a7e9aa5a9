use std::fs;
use std::io;

use chrono::{Days, Local, NaiveDate};
use thiserror::Error;

use crate::billing;
use crate::cli::Opts;
use crate::config::{self, Config, ConfigError};
use crate::harvest::{ApiError, Harvest, InvoiceDraft, TimeApi};
use crate::input::{self, Prompt, Terminal};
use crate::timesheet;

// 20 day payment term plus 3 days for the transfer to land.
const PAYMENT_TERM_DAYS: u64 = 23;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("IO Error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("{source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Input Error: {source}")]
    Input {
        #[from]
        source: inquire::error::InquireError,
    },

    #[error("{source}")]
    Api {
        #[from]
        source: ApiError,
    },

    #[error("This tool doesn't handle more than 100 time entries")]
    TooManyEntries,

    #[error(
        "Invoicing is only supported for clients with a single active \
         project, found {count}"
    )]
    TooManyProjects { count: usize },

    #[error("No active project found for this client")]
    NoActiveProject,
}

pub async fn run(opts: Opts) -> Result<(), RunError> {
    let config = load_or_configure(&opts)?;
    let api = Harvest::new(&config)?;
    let mut prompt = Terminal;
    session(&config, &api, &mut prompt, Local::now().date_naive()).await
}

fn load_or_configure(opts: &Opts) -> Result<Config, RunError> {
    if !opts.configure {
        match Config::load(&opts.file) {
            Ok(config) => return Ok(config),
            Err(error) => {
                tracing::debug!(%error, "configuration incomplete, starting wizard");
            }
        }
    }

    let existing = config::read_partial(&opts.file);
    let config = input::configure(&existing)?;
    config.save(&opts.file)?;
    Ok(config)
}

/// One interactive session: pick a period and client, fetch and fold the
/// time entries, write the CSV, then optionally invoice the period.
async fn session<A: TimeApi, P: Prompt>(
    config: &Config,
    api: &A,
    prompt: &mut P,
    today: NaiveDate,
) -> Result<(), RunError> {
    let period = prompt.select_period(billing::timesheet_periods(today))?;
    let client = prompt.select_client(api.list_clients().await?)?;

    let page = api.list_time_entries(client.id, &period).await?;
    if page.total_pages > 1 {
        return Err(RunError::TooManyEntries);
    }

    let rows = timesheet::aggregate(&page.time_entries);

    println!("\nHours:");
    for row in &rows {
        println!("  {}\t{}\t{}", row.date, row.hours, row.notes);
    }
    println!("\nTotal {}", timesheet::total(&rows));

    let output_file = config
        .output_folder
        .join(format!("timesheet-{}-{}.csv", client.id, period.until));
    fs::write(&output_file, timesheet::to_csv(&rows))?;
    println!("\nCSV written to {}\n", output_file.display());

    if !prompt.confirm_invoice()? {
        return Ok(());
    }

    let mut projects = api.list_projects(client.id).await?;
    if projects.len() > 1 {
        return Err(RunError::TooManyProjects {
            count: projects.len(),
        });
    }
    let project = projects.pop().ok_or(RunError::NoActiveProject)?;

    let issue_date = period.until + Days::new(1);
    let draft = InvoiceDraft {
        client_id: client.id,
        project_id: project.id,
        subject: format!(
            "Invoice for {} to {} at {}",
            period.from, period.until, project.name
        ),
        issue_date,
        due_date: issue_date + Days::new(PAYMENT_TERM_DAYS),
        period,
    };

    let invoice = api.create_invoice(&draft).await?;
    api.send_invoice(invoice.id).await?;
    println!(
        "https://{}.harvestapp.com/invoices/{}",
        config.subdomain, invoice.id
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::Period;
    use crate::harvest::{
        Client, Invoice, Project, Task, TimeEntriesPage, TimeEntry,
    };
    use inquire::error::InquireError;
    use std::cell::RefCell;
    use std::path::Path;

    struct FakeApi {
        entries: Vec<TimeEntry>,
        total_pages: u32,
        projects: Vec<Project>,
        created: RefCell<Vec<InvoiceDraft>>,
        sent: RefCell<Vec<u64>>,
    }

    impl FakeApi {
        fn new(entries: Vec<TimeEntry>, projects: Vec<Project>) -> Self {
            Self {
                entries,
                total_pages: 1,
                projects,
                created: RefCell::new(Vec::new()),
                sent: RefCell::new(Vec::new()),
            }
        }
    }

    impl TimeApi for FakeApi {
        async fn list_clients(&self) -> Result<Vec<Client>, ApiError> {
            Ok(vec![Client {
                id: 5735776,
                name: "Innotech".to_string(),
            }])
        }

        async fn list_time_entries(
            &self,
            _client_id: u64,
            _period: &Period,
        ) -> Result<TimeEntriesPage, ApiError> {
            Ok(TimeEntriesPage {
                time_entries: self.entries.clone(),
                total_pages: self.total_pages,
            })
        }

        async fn list_projects(
            &self,
            _client_id: u64,
        ) -> Result<Vec<Project>, ApiError> {
            Ok(self.projects.clone())
        }

        async fn create_invoice(
            &self,
            draft: &InvoiceDraft,
        ) -> Result<Invoice, ApiError> {
            self.created.borrow_mut().push(draft.clone());
            Ok(Invoice { id: 19026225 })
        }

        async fn send_invoice(
            &self,
            invoice_id: u64,
        ) -> Result<(), ApiError> {
            self.sent.borrow_mut().push(invoice_id);
            Ok(())
        }
    }

    /// Always picks the first choice offered.
    struct Scripted {
        invoice: bool,
    }

    impl Prompt for Scripted {
        fn select_period(
            &mut self,
            mut periods: Vec<Period>,
        ) -> Result<Period, InquireError> {
            Ok(periods.remove(0))
        }

        fn select_client(
            &mut self,
            mut clients: Vec<Client>,
        ) -> Result<Client, InquireError> {
            Ok(clients.remove(0))
        }

        fn confirm_invoice(&mut self) -> Result<bool, InquireError> {
            Ok(self.invoice)
        }
    }

    fn test_config(output_folder: &Path) -> Config {
        Config {
            subdomain: "acme".to_string(),
            account_id: "12345".to_string(),
            access_token: "pat.secret".to_string(),
            output_folder: output_folder.to_path_buf(),
        }
    }

    fn entry(spent_date: &str, rounded_hours: f64, task: &str) -> TimeEntry {
        TimeEntry {
            spent_date: spent_date.to_string(),
            rounded_hours,
            task: Task {
                name: task.to_string(),
            },
        }
    }

    fn project() -> Project {
        Project {
            id: 14307913,
            name: "Site Redesign".to_string(),
        }
    }

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[tokio::test]
    async fn full_session_writes_the_csv_and_sends_an_invoice() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let api = FakeApi::new(
            vec![
                entry("2024-02-05", 3.5, "Development"),
                entry("2024-02-08", 2.0, "Design / Review"),
            ],
            vec![project()],
        );
        let mut prompt = Scripted { invoice: true };

        // Feb 20 offers the current month's halves; the scripted prompt
        // picks the first, Feb 1 to 15.
        session(&config, &api, &mut prompt, ymd(2024, 2, 20))
            .await
            .unwrap();

        let csv = fs::read_to_string(
            dir.path().join("timesheet-5735776-2024-02-15.csv"),
        )
        .unwrap();
        assert_eq!(
            csv,
            "Date,Hours,Notes\n\
             2024-02-05,3.5,\"Development\"\n\
             2024-02-08,2,\"Design & Review\""
        );

        let created = api.created.borrow();
        assert_eq!(created.len(), 1);
        assert_eq!(
            created[0].subject,
            "Invoice for 2024-02-01 to 2024-02-15 at Site Redesign"
        );
        assert_eq!(created[0].issue_date, ymd(2024, 2, 16));
        assert_eq!(created[0].due_date, ymd(2024, 3, 10));
        assert_eq!(*api.sent.borrow(), vec![19026225]);
    }

    #[tokio::test]
    async fn declining_the_invoice_stops_after_the_csv() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let api = FakeApi::new(
            vec![entry("2024-02-01", 1.0, "Development")],
            vec![project()],
        );
        let mut prompt = Scripted { invoice: false };

        session(&config, &api, &mut prompt, ymd(2024, 2, 20))
            .await
            .unwrap();

        assert!(dir
            .path()
            .join("timesheet-5735776-2024-02-15.csv")
            .exists());
        assert!(api.created.borrow().is_empty());
        assert!(api.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn a_second_page_of_entries_aborts_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut api = FakeApi::new(
            vec![entry("2024-02-01", 1.0, "Development")],
            vec![project()],
        );
        api.total_pages = 2;
        let mut prompt = Scripted { invoice: true };

        let result =
            session(&config, &api, &mut prompt, ymd(2024, 2, 20)).await;

        assert!(matches!(result, Err(RunError::TooManyEntries)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn more_than_one_active_project_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let api = FakeApi::new(
            vec![entry("2024-02-01", 1.0, "Development")],
            vec![
                project(),
                Project {
                    id: 14307914,
                    name: "Maintenance".to_string(),
                },
            ],
        );
        let mut prompt = Scripted { invoice: true };

        let result =
            session(&config, &api, &mut prompt, ymd(2024, 2, 20)).await;

        assert!(matches!(
            result,
            Err(RunError::TooManyProjects { count: 2 })
        ));
        assert!(api.created.borrow().is_empty());
    }

    #[tokio::test]
    async fn a_client_without_active_projects_cannot_be_invoiced() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let api = FakeApi::new(
            vec![entry("2024-02-01", 1.0, "Development")],
            Vec::new(),
        );
        let mut prompt = Scripted { invoice: true };

        let result =
            session(&config, &api, &mut prompt, ymd(2024, 2, 20)).await;

        assert!(matches!(result, Err(RunError::NoActiveProject)));
    }
}
