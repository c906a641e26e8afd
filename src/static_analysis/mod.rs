//! Static analysis session.
//!
//! Covers the life of an uploaded package on the static side of the service: upload, scan,
//! reports, source browsing and suppression rules. Every call is keyed by the [`Hash`] the
//! upload returned. The session state lives on the service; nothing is cached here, so a
//! deleted scan is reported as missing by the service instead of being served stale.

pub mod model;

use crate::{
    error::Result,
    transport::{Payload, Transport},
    Hash,
};
use log::{debug, info};
use reqwest::Method;
use std::sync::Arc;

pub use self::model::{
    Acknowledgement, FindingType, PdfReport, RecentScans, Report, ScanLogEntry, ScanLogs,
    ScanRecord, Scorecard, SearchResult, SourceFile, SourceKind, SuppressionKind,
    SuppressionRule, Suppressions, Task, UploadResult,
};

const UPLOAD: &str = "api/v1/upload";
const SCAN: &str = "api/v1/scan";
const SCAN_LOGS: &str = "api/v1/scan_logs";
const SEARCH: &str = "api/v1/search";
const DELETE_SCAN: &str = "api/v1/delete_scan";
const SCORECARD: &str = "api/v1/scorecard";
const DOWNLOAD_PDF: &str = "api/v1/download_pdf";
const REPORT_JSON: &str = "api/v1/report_json";
const VIEW_SOURCE: &str = "api/v1/view_source";
const SCANS: &str = "api/v1/scans";
const TASKS: &str = "api/v1/tasks";
const SUPPRESS_BY_RULE: &str = "api/v1/suppress_by_rule";
const SUPPRESS_BY_FILES: &str = "api/v1/suppress_by_files";
const LIST_SUPPRESSIONS: &str = "api/v1/list_suppressions";
const DELETE_SUPPRESSION: &str = "api/v1/delete_suppression";

/// Client of the static analysis endpoints.
#[derive(Debug, Clone)]
pub struct StaticAnalyzer {
    transport: Arc<Transport>,
}

impl StaticAnalyzer {
    /// Creates the analyzer on top of a shared transport.
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Uploads a package (`apk`, `xapk`, `apks`, `zip`, `ipa` or `appx`).
    ///
    /// The contents are sent as they are: the service validates the package.
    pub async fn upload<S: Into<String>>(
        &self,
        bytes: Vec<u8>,
        file_name: S,
    ) -> Result<UploadResult> {
        let file_name = file_name.into();
        debug!("uploading `{}` ({} bytes)", file_name, bytes.len());

        let upload: UploadResult = self
            .transport
            .fetch(Method::POST, UPLOAD, Payload::File { file_name, bytes })
            .await?;
        info!("`{}` uploaded with hash {}", upload.file_name(), upload.hash());
        Ok(upload)
    }

    /// Scans an uploaded package.
    ///
    /// Without `re_scan`, an already scanned package returns the stored results. With it, the
    /// analysis runs again and overwrites the stored findings.
    pub async fn scan(&self, hash: &Hash, re_scan: bool) -> Result<ScanRecord> {
        let form = vec![
            ("hash", hash.to_string()),
            ("re_scan", String::from(if re_scan { "1" } else { "0" })),
        ];
        self.transport
            .fetch(Method::POST, SCAN, Payload::Form(form))
            .await
    }

    /// Gets the live logs of a scan. Callers poll this at their own pace.
    pub async fn scan_logs(&self, hash: &Hash) -> Result<ScanLogs> {
        self.transport
            .fetch(Method::POST, SCAN_LOGS, hash_form(hash))
            .await
    }

    /// Searches scans by hash, application name, package name or file name.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.transport
            .fetch(
                Method::POST,
                SEARCH,
                Payload::Form(vec![("query", query.to_owned())]),
            )
            .await
    }

    /// Lists the recent scans, `page` starting at 1.
    ///
    /// A page past the last one is empty; it is not an error.
    pub async fn recent_scans(&self, page: u32, page_size: u32) -> Result<RecentScans> {
        let query = vec![
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
        ];
        let scans: RecentScans = self
            .transport
            .fetch(Method::GET, SCANS, Payload::Query(query))
            .await?;
        Ok(scans.bound_to(page, page_size))
    }

    /// Lists the tasks of the asynchronous scan queue.
    pub async fn scan_tasks(&self) -> Result<Vec<Task>> {
        self.transport
            .fetch(Method::POST, TASKS, Payload::Empty)
            .await
    }

    /// Gets the security scorecard of a scanned package.
    pub async fn scorecard(&self, hash: &Hash) -> Result<Scorecard> {
        self.transport
            .fetch(Method::POST, SCORECARD, hash_form(hash))
            .await
    }

    /// Gets the JSON report of a scanned package.
    pub async fn json_report(&self, hash: &Hash) -> Result<Report> {
        self.transport
            .fetch(Method::POST, REPORT_JSON, hash_form(hash))
            .await
    }

    /// Downloads the PDF report of a scanned package.
    pub async fn download_pdf_report(&self, hash: &Hash) -> Result<PdfReport> {
        let bytes = self
            .transport
            .send(Method::POST, DOWNLOAD_PDF, hash_form(hash))
            .await?;
        Ok(PdfReport::new(bytes))
    }

    /// Gets a source file of a scanned package.
    ///
    /// The relative path is sent exactly as given; the service checks it for traversal.
    pub async fn view_source_file(
        &self,
        hash: &Hash,
        relative_path: &str,
        kind: SourceKind,
    ) -> Result<SourceFile> {
        let form = vec![
            ("hash", hash.to_string()),
            ("file", relative_path.to_owned()),
            ("type", kind.to_string()),
        ];
        self.transport
            .fetch(Method::POST, VIEW_SOURCE, Payload::Form(form))
            .await
    }

    /// Deletes a scan. The service drops its suppression rules along with it.
    pub async fn delete_scan(&self, hash: &Hash) -> Result<Acknowledgement> {
        let answer = self
            .transport
            .fetch(Method::POST, DELETE_SCAN, hash_form(hash))
            .await?;
        info!("scan {} deleted", hash);
        Ok(answer)
    }

    /// Suppresses the findings of a rule in the whole scan.
    pub async fn suppress_by_rule(
        &self,
        hash: &Hash,
        finding_type: FindingType,
        rule: &str,
    ) -> Result<Acknowledgement> {
        let rule = SuppressionRule::new(hash.clone(), SuppressionKind::Rule, finding_type, rule);
        self.suppress(&rule).await
    }

    /// Suppresses the findings of a rule in the files it was found in.
    pub async fn suppress_by_files(
        &self,
        hash: &Hash,
        finding_type: FindingType,
        rule: &str,
    ) -> Result<Acknowledgement> {
        let rule = SuppressionRule::new(hash.clone(), SuppressionKind::File, finding_type, rule);
        self.suppress(&rule).await
    }

    /// Creates a suppression rule.
    ///
    /// The service owns uniqueness: adding an existing rule leaves the same state behind and
    /// is not reported as an error.
    pub async fn suppress(&self, rule: &SuppressionRule) -> Result<Acknowledgement> {
        let path = match rule.kind() {
            SuppressionKind::Rule => SUPPRESS_BY_RULE,
            SuppressionKind::File => SUPPRESS_BY_FILES,
        };
        self.transport
            .fetch(Method::POST, path, Payload::Form(rule.form()))
            .await
    }

    /// Lists the suppression rules of a scan.
    pub async fn list_suppressions(&self, hash: &Hash) -> Result<Suppressions> {
        self.transport
            .fetch(Method::POST, LIST_SUPPRESSIONS, hash_form(hash))
            .await
    }

    /// Deletes a suppression rule.
    pub async fn delete_suppression(
        &self,
        hash: &Hash,
        finding_type: FindingType,
        rule: &str,
        kind: SuppressionKind,
    ) -> Result<Acknowledgement> {
        let rule = SuppressionRule::new(hash.clone(), kind, finding_type, rule);
        self.remove_suppression(&rule).await
    }

    /// Deletes the given suppression rule.
    pub async fn remove_suppression(&self, rule: &SuppressionRule) -> Result<Acknowledgement> {
        let mut form = rule.form();
        form.push(("kind", rule.kind().to_string()));
        self.transport
            .fetch(Method::POST, DELETE_SUPPRESSION, Payload::Form(form))
            .await
    }
}

fn hash_form(hash: &Hash) -> Payload {
    Payload::Form(vec![("hash", hash.to_string())])
}
