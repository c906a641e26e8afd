//! Results of the static analysis endpoints.

use crate::Hash;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{
    de::{self, Deserializer},
    ser::Serializer,
    Deserialize, Serialize,
};
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

wire_enum! {
    /// Kind of finding a suppression rule applies to.
    pub enum FindingType {
        /// Source code finding.
        Code => "code",
        /// Manifest finding.
        Manifest => "manifest",
    }
}

wire_enum! {
    /// Scope of a suppression rule.
    pub enum SuppressionKind {
        /// The rule is suppressed everywhere.
        Rule => "rule",
        /// The rule is suppressed in the files it was found in.
        File => "file",
    }
}

wire_enum! {
    /// Kind of the scanned package, used to locate its source files.
    pub enum SourceKind {
        /// Android package.
        Apk => "apk",
        /// iOS package.
        Ipa => "ipa",
        /// Zipped Android Studio project.
        Studio => "studio",
        /// Zipped Eclipse project.
        Eclipse => "eclipse",
        /// Zipped iOS project.
        Ios => "ios",
    }
}

/// Answer to an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    hash: Hash,
    file_name: String,
    scan_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
}

impl UploadResult {
    /// Gets the hash assigned to the uploaded package.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// Gets the file name of the upload.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Gets the scan type the service derived from the upload (`apk`, `ipa`, `zip`…).
    pub fn scan_type(&self) -> &str {
        &self.scan_type
    }

    /// Gets the analyzer that will handle the package, if reported.
    pub fn analyzer(&self) -> Option<&str> {
        self.analyzer.as_ref().map(String::as_str)
    }
}

/// Entry of the scan logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanLogEntry {
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    exception: Option<String>,
}

impl ScanLogEntry {
    /// Gets the moment of the entry, as sent by the service.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Gets the status message.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Gets the exception raised at this step, if any.
    pub fn exception(&self) -> Option<&str> {
        self.exception.as_ref().map(String::as_str)
    }
}

/// Live logs of a scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanLogs {
    #[serde(default)]
    logs: Vec<ScanLogEntry>,
}

impl ScanLogs {
    /// Gets the log entries, oldest first.
    pub fn entries(&self) -> &[ScanLogEntry] {
        &self.logs
    }

    /// Gets the last entry, if any.
    pub fn last(&self) -> Option<&ScanLogEntry> {
        self.logs.last()
    }
}

/// Scan record of an analyzed package.
///
/// The service sends two shapes of the same record: the uppercase summary of the scan lists
/// (`MD5`, `FILE_NAME`…) and the lowercase full report returned by a scan (`md5`,
/// `file_name`…). Both are accepted; the complete payload is kept and serialized back
/// untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRecord {
    hash: Hash,
    file_name: String,
    scan_type: String,
    analyzer: String,
    app_name: String,
    package_name: String,
    version_name: String,
    timestamp: Option<String>,
    logs: Vec<ScanLogEntry>,
    raw: Map<String, Value>,
}

impl ScanRecord {
    /// Builds the record from the decoded payload.
    pub fn from_map(raw: Map<String, Value>) -> Result<Self, String> {
        let hash = string_field(&raw, &["MD5", "md5", "hash"])
            .ok_or_else(|| String::from("the scan record has no `MD5` hash"))?;
        let logs = raw
            .get("SCAN_LOGS")
            .or_else(|| raw.get("logs"))
            .map(parse_logs)
            .unwrap_or_default();

        Ok(Self {
            hash: Hash::new(hash),
            file_name: string_field(&raw, &["FILE_NAME", "file_name"]).unwrap_or_default(),
            scan_type: string_field(&raw, &["SCAN_TYPE", "scan_type", "app_type"])
                .unwrap_or_default(),
            analyzer: string_field(&raw, &["ANALYZER", "analyzer"]).unwrap_or_default(),
            app_name: string_field(&raw, &["APP_NAME", "app_name"]).unwrap_or_default(),
            package_name: string_field(&raw, &["PACKAGE_NAME", "package_name", "bundle_id"])
                .unwrap_or_default(),
            version_name: string_field(&raw, &["VERSION_NAME", "version_name", "app_version"])
                .unwrap_or_default(),
            timestamp: string_field(&raw, &["TIMESTAMP", "timestamp"]),
            logs,
            raw,
        })
    }

    /// Gets the hash of the scanned package.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// Gets the file name of the scanned package.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Gets the scan type.
    pub fn scan_type(&self) -> &str {
        &self.scan_type
    }

    /// Gets the analyzer that produced the record.
    pub fn analyzer(&self) -> &str {
        &self.analyzer
    }

    /// Gets the application name.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Gets the package name or bundle identifier.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Gets the application version.
    pub fn version_name(&self) -> &str {
        &self.version_name
    }

    /// Gets the scan timestamp, as sent by the service.
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_ref().map(String::as_str)
    }

    /// Parses the scan timestamp. The service stores UTC times.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        let timestamp = self.timestamp.as_ref()?;
        DateTime::parse_from_rfc3339(timestamp)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                    .iter()
                    .filter_map(|f| NaiveDateTime::parse_from_str(timestamp, f).ok())
                    .next()
                    .map(|t| Utc.from_utc_datetime(&t))
            })
    }

    /// Gets the scan logs embedded in the record.
    pub fn logs(&self) -> &[ScanLogEntry] {
        &self.logs
    }

    /// Gets any field of the record.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    /// Gets the complete record.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.raw
    }
}

impl<'de> Deserialize<'de> for ScanRecord {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Map::<String, Value>::deserialize(de)?;
        ScanRecord::from_map(raw).map_err(de::Error::custom)
    }
}

impl Serialize for ScanRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.raw.serialize(serializer)
    }
}

fn string_field(raw: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| raw.get(*k))
        .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .next()
}

fn parse_logs(value: &Value) -> Vec<ScanLogEntry> {
    // Stored logs are sometimes a JSON encoded string.
    let value = match value {
        Value::String(s) => match serde_json::from_str(s) {
            Ok(v) => v,
            Err(_) => return Vec::new(),
        },
        other => other.clone(),
    };
    serde_json::from_value(value).unwrap_or_default()
}

/// Page of the recent scans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentScans {
    #[serde(default)]
    content: Vec<ScanRecord>,
    #[serde(default)]
    count: u64,
    #[serde(default)]
    num_pages: u64,
}

impl RecentScans {
    /// Gets the scans of the page.
    pub fn content(&self) -> &[ScanRecord] {
        &self.content
    }

    /// Gets the total number of scans.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Gets the number of pages.
    pub fn num_pages(&self) -> u64 {
        self.num_pages
    }

    /// Empties the page if `page` is past the last one.
    pub(crate) fn bound_to(mut self, page: u32, page_size: u32) -> Self {
        let pages = if self.num_pages > 0 {
            self.num_pages
        } else if page_size > 0 {
            (self.count + u64::from(page_size) - 1) / u64::from(page_size)
        } else {
            0
        };
        if u64::from(page) > pages || page == 0 {
            self.content.clear();
        }
        self
    }
}

/// Scan matching a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    app_name: String,
    #[serde(default)]
    package_name: String,
    hash: Hash,
    #[serde(default)]
    file_name: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl SearchResult {
    /// Gets the hash of the matching scan.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// Gets the application name.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Gets the package name.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Gets the file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Scan task of the asynchronous scan queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: u64,
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    progress: f64,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    requested_by: String,
}

impl Task {
    /// Gets the task identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Gets the file name of the queued package.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Gets the kind of task.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Gets the task status.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Gets the progress of the task.
    pub fn progress(&self) -> f64 {
        self.progress
    }
}

/// Security scorecard of a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    #[serde(deserialize_with = "deserialize_score")]
    security_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trackers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total_trackers: Option<u64>,
    #[serde(flatten)]
    findings: Map<String, Value>,
}

impl Scorecard {
    /// Gets the security score, between 0 and 100.
    pub fn security_score(&self) -> u8 {
        self.security_score
    }

    /// Gets the number of trackers detected.
    pub fn trackers(&self) -> Option<u64> {
        self.trackers
    }

    /// Gets the number of trackers known to the service.
    pub fn total_trackers(&self) -> Option<u64> {
        self.total_trackers
    }

    /// Gets the findings of a severity (`high`, `warning`, `info`, `secure`, `hotspot`).
    pub fn findings(&self, severity: &str) -> Option<&Value> {
        self.findings.get(severity)
    }
}

fn deserialize_score<'de, D>(de: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let score = f64::deserialize(de)?;
    if score.is_finite() && score >= 0.0 && score <= 100.0 {
        Ok(score.round() as u8)
    } else {
        Err(de::Error::custom(format!(
            "the security score must be between 0 and 100, got {}",
            score
        )))
    }
}

/// JSON report, as produced by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report(Value);

impl Report {
    /// Gets a top level section of the report.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Gets the hash of the reported package, if present.
    pub fn hash(&self) -> Option<&str> {
        ["md5", "MD5", "hash"]
            .iter()
            .filter_map(|k| self.0.get(*k))
            .filter_map(Value::as_str)
            .next()
    }

    /// Gets the whole report.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the report.
    pub fn into_value(self) -> Value {
        self.0
    }
}

/// PDF report.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfReport(Bytes);

impl PdfReport {
    pub(crate) fn new(bytes: Bytes) -> Self {
        PdfReport(bytes)
    }

    /// Gets the contents of the document.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Checks the PDF signature of the document.
    pub fn is_pdf(&self) -> bool {
        self.0.starts_with(b"%PDF")
    }

    /// Consumes the report.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

/// Source file of a scanned package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    #[serde(default)]
    data: String,
    #[serde(default)]
    file: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl SourceFile {
    /// Gets the contents of the file.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Gets the path of the file, as reported by the service.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Gets the kind of file.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Gets any other field of the answer.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Answer to a state changing call (deletion, suppression…).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Acknowledgement(Map<String, Value>);

impl Acknowledgement {
    /// Gets the status reported by the service, if any.
    pub fn status(&self) -> Option<&str> {
        ["status", "deleted"]
            .iter()
            .filter_map(|k| self.0.get(*k))
            .filter_map(Value::as_str)
            .next()
    }

    /// Gets the message reported by the service, if it is a string.
    pub fn message(&self) -> Option<&str> {
        self.0.get("message").and_then(Value::as_str)
    }

    /// Gets any field of the answer.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Suppression rule of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuppressionRule {
    hash: Hash,
    kind: SuppressionKind,
    #[serde(rename = "type")]
    finding_type: FindingType,
    rule: String,
}

impl SuppressionRule {
    /// Creates a suppression rule.
    pub fn new<S: Into<String>>(
        hash: Hash,
        kind: SuppressionKind,
        finding_type: FindingType,
        rule: S,
    ) -> Self {
        Self {
            hash,
            kind,
            finding_type,
            rule: rule.into(),
        }
    }

    /// Gets the hash of the scan owning the rule.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// Gets the scope of the rule.
    pub fn kind(&self) -> SuppressionKind {
        self.kind
    }

    /// Gets the kind of finding suppressed.
    pub fn finding_type(&self) -> FindingType {
        self.finding_type
    }

    /// Gets the suppressed rule identifier.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Form fields identifying the rule.
    pub(crate) fn form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("hash", self.hash.to_string()),
            ("type", self.finding_type.to_string()),
            ("rule", self.rule.clone()),
        ]
    }
}

/// Suppression rules of a scan, as listed by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Suppressions(Value);

impl Suppressions {
    /// Gets the listed entries.
    pub fn entries(&self) -> &[Value] {
        let list = match self.0.get("message") {
            Some(message) => message,
            None => &self.0,
        };
        list.as_array().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Gets the whole answer.
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{FindingType, RecentScans, Scorecard, ScanRecord, SourceKind, Suppressions};
    use serde_json::json;

    #[test]
    fn it_scan_record_list_shape() {
        let record: ScanRecord = serde_json::from_value(json!({
            "ANALYZER": "static_analyzer",
            "SCAN_TYPE": "apk",
            "FILE_NAME": "diva-beta.apk",
            "APP_NAME": "Diva",
            "PACKAGE_NAME": "jakhar.aseem.diva",
            "VERSION_NAME": "1.0",
            "MD5": "82ab8b2193b3cfb1c737e3a786be363a",
            "TIMESTAMP": "2024-05-17T09:12:44.508Z",
            "SCAN_LOGS": "[{\"timestamp\": \"2024-05-17 09:12:40\", \"status\": \"Generating Hashes\", \"exception\": null}]"
        }))
        .unwrap();

        assert_eq!(record.hash(), "82ab8b2193b3cfb1c737e3a786be363a");
        assert_eq!(record.file_name(), "diva-beta.apk");
        assert_eq!(record.package_name(), "jakhar.aseem.diva");
        assert_eq!(record.logs().len(), 1);
        assert_eq!(record.logs()[0].status(), "Generating Hashes");
        assert!(record.timestamp_utc().is_some());
    }

    #[test]
    fn it_scan_record_report_shape() {
        let record: ScanRecord = serde_json::from_value(json!({
            "md5": "H1",
            "file_name": "app.ipa",
            "app_name": "App",
            "bundle_id": "com.example.app",
            "app_version": "2.1",
            "timestamp": "2024-05-17 09:12:44",
            "appsec": {"security_score": 55}
        }))
        .unwrap();

        assert_eq!(record.hash(), "H1");
        assert_eq!(record.package_name(), "com.example.app");
        assert_eq!(record.version_name(), "2.1");
        assert!(record.timestamp_utc().is_some());
        assert_eq!(record.get("appsec").unwrap()["security_score"], 55);

        // The complete payload is serialized back.
        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["bundle_id"], "com.example.app");
    }

    #[test]
    fn it_scan_record_needs_hash() {
        assert!(serde_json::from_value::<ScanRecord>(json!({"FILE_NAME": "a.apk"})).is_err());
    }

    #[test]
    fn it_recent_scans_out_of_range() {
        let page: RecentScans = serde_json::from_value(json!({
            "content": [{"MD5": "A"}, {"MD5": "B"}, {"MD5": "C"}],
            "count": 3,
            "num_pages": 1
        }))
        .unwrap();

        assert_eq!(page.clone().bound_to(1, 5).content().len(), 3);
        assert!(page.clone().bound_to(2, 5).content().is_empty());
        assert_eq!(page.bound_to(2, 5).count(), 3);
    }

    #[test]
    fn it_scorecard_range() {
        let card: Scorecard = serde_json::from_value(json!({
            "security_score": 48,
            "trackers": 1,
            "total_trackers": 428,
            "high": [{"title": "Debug Enabled"}]
        }))
        .unwrap();
        assert_eq!(card.security_score(), 48);
        assert_eq!(card.total_trackers(), Some(428));
        assert!(card.findings("high").is_some());

        assert!(serde_json::from_value::<Scorecard>(json!({"security_score": 120})).is_err());
        assert!(serde_json::from_value::<Scorecard>(json!({"security_score": -1})).is_err());
    }

    #[test]
    fn it_suppressions_entries() {
        let wrapped: Suppressions =
            serde_json::from_value(json!({"message": [{"SUPPRESS_TYPE": "code"}]})).unwrap();
        assert_eq!(wrapped.entries().len(), 1);

        let bare: Suppressions = serde_json::from_value(json!([])).unwrap();
        assert!(bare.entries().is_empty());
    }

    #[test]
    fn it_wire_strings() {
        assert_eq!(FindingType::Manifest.as_str(), "manifest");
        assert_eq!("studio".parse::<SourceKind>().unwrap(), SourceKind::Studio);
        assert!("exe".parse::<SourceKind>().is_err());
    }
}
