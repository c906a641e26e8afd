//! Results and parameters of the dynamic analysis endpoints.

use crate::Hash;
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

wire_enum! {
    /// Action on the interception root CA of the device.
    pub enum RootCaAction {
        /// Installs the root CA, enabling TLS inspection.
        Install => "install",
        /// Removes the root CA.
        Remove => "remove",
    }
}

wire_enum! {
    /// Action on the global HTTP proxy of the device.
    pub enum ProxyAction {
        /// Points the device proxy to the service.
        Set => "set",
        /// Removes the device proxy.
        Unset => "unset",
    }
}

wire_enum! {
    /// Activity tester to run.
    pub enum ActivityTest {
        /// Launches the exported activities.
        Exported => "exported",
        /// Launches every activity.
        Activity => "activity",
    }
}

wire_enum! {
    /// Kind of a file captured during dynamic analysis.
    pub enum DynamicSourceKind {
        /// XML file, such as shared preferences.
        Xml => "xml",
        /// SQLite database.
        Db => "db",
        /// Any other file.
        Others => "others",
    }
}

/// Application available on the analysis device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceApp {
    #[serde(rename = "MD5")]
    hash: Hash,
    #[serde(rename = "PACKAGE_NAME", default)]
    package_name: String,
    #[serde(rename = "APP_NAME", default)]
    app_name: String,
    #[serde(rename = "VERSION_NAME", default)]
    version_name: String,
    #[serde(rename = "FILE_NAME", default)]
    file_name: String,
    #[serde(rename = "ICON_PATH", default, skip_serializing_if = "Option::is_none")]
    icon_path: Option<String>,
    #[serde(rename = "DYNAMIC_REPORT_EXISTS", default)]
    dynamic_report_exists: bool,
}

impl DeviceApp {
    /// Gets the hash of the uploaded package of the application.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// Gets the package name.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Gets the application name.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Gets the application version.
    pub fn version_name(&self) -> &str {
        &self.version_name
    }

    /// Gets the file name of the uploaded package.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Gets the icon path, if any.
    pub fn icon_path(&self) -> Option<&str> {
        self.icon_path.as_ref().map(String::as_str)
    }

    /// Whether a dynamic report already exists for the application.
    pub fn dynamic_report_exists(&self) -> bool {
        self.dynamic_report_exists
    }
}

/// Discovery snapshot: instrumentable applications plus device and proxy information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppsSnapshot {
    #[serde(default)]
    apks: Vec<DeviceApp>,
    #[serde(default)]
    identifier: String,
    #[serde(default)]
    proxy_ip: String,
    #[serde(default)]
    proxy_port: u16,
    #[serde(default)]
    title: String,
    #[serde(default)]
    version: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl AppsSnapshot {
    /// Gets the available applications.
    pub fn apps(&self) -> &[DeviceApp] {
        &self.apks
    }

    /// Finds an application by the hash of its package.
    pub fn find(&self, hash: &Hash) -> Option<&DeviceApp> {
        self.apks.iter().find(|a| a.hash() == hash)
    }

    /// Gets the identifier of the analysis device.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Gets the address of the interception proxy.
    pub fn proxy_ip(&self) -> &str {
        &self.proxy_ip
    }

    /// Gets the port of the interception proxy.
    pub fn proxy_port(&self) -> u16 {
        self.proxy_port
    }

    /// Gets the page title reported by the service.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Gets the service version.
    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Answer of the dynamic analysis and instrumentation endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl DynamicResponse {
    /// Gets the status reported by the service (`ok`…).
    pub fn status(&self) -> Option<&str> {
        self.status.as_ref().map(String::as_str)
    }

    /// Whether the service reported `ok`.
    pub fn is_ok(&self) -> bool {
        self.status() == Some("ok")
    }

    /// Gets the message, if it is a string.
    pub fn message(&self) -> Option<&str> {
        self.message.as_ref().and_then(Value::as_str)
    }

    /// Gets the data payload.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Gets any other field of the answer.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}
