use std::collections::HashMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const STATUS_INACTIVE: &str = "INACTIVE";
pub const HASH_ALGO_SHA1: &str = "SHA1";

/// Gates which asset kinds may be attached to a product.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum SolutionType {
    Chart,
    Image,
    Ova,
    Iso,
    Others,
    Saas,
    #[default]
    Unset,
    Unknown(String),
}

impl From<String> for SolutionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "CHART" => Self::Chart,
            "IMAGE" => Self::Image,
            "OVA" => Self::Ova,
            "ISO" => Self::Iso,
            "OTHERS" => Self::Others,
            "SAAS" => Self::Saas,
            "" => Self::Unset,
            _ => Self::Unknown(value),
        }
    }
}

impl From<SolutionType> for String {
    fn from(value: SolutionType) -> Self {
        match value {
            SolutionType::Unknown(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl SolutionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Chart => "CHART",
            Self::Image => "IMAGE",
            Self::Ova => "OVA",
            Self::Iso => "ISO",
            Self::Others => "OTHERS",
            Self::Saas => "SAAS",
            Self::Unset => "",
            Self::Unknown(other) => other,
        }
    }
}

impl Display for SolutionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A catalog entry. Unrecognised fields are kept in `extra` because updates
/// replace the whole record.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Product {
    #[serde(rename = "productid", default)]
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(rename = "displayname", default)]
    pub display_name: String,
    #[serde(rename = "solutiontype", default)]
    pub solution_type: SolutionType,
    #[serde(rename = "currentversion", default)]
    pub current_version: String,
    #[serde(default)]
    pub versions: Vec<Version>,
    #[serde(rename = "allversiondetails", default)]
    pub all_versions: Vec<Version>,
    #[serde(rename = "chartversions", default, skip_serializing_if = "Vec::is_empty")]
    pub chart_versions: Vec<ChartVersion>,
    #[serde(rename = "dockerlinkversions", default, skip_serializing_if = "Vec::is_empty")]
    pub docker_link_versions: Vec<DockerVersionList>,
    #[serde(rename = "productdeploymentfiles", default, skip_serializing_if = "Vec::is_empty")]
    pub deployment_files: Vec<ProductDeploymentFile>,
    #[serde(rename = "metafilesList", default, skip_serializing_if = "Vec::is_empty")]
    pub meta_files: Vec<MetaFile>,
    #[serde(rename = "addonfiles", default, skip_serializing_if = "Vec::is_empty")]
    pub addon_files: Vec<AddonFile>,
    #[serde(rename = "encryptiondetails", default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionDetails>,
    #[serde(rename = "compatibilitymatrix", default)]
    pub compatibility_matrix: Vec<Value>,
    #[serde(rename = "pcadetails", default, skip_serializing_if = "Option::is_none")]
    pub pca_details: Option<PcaDetails>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    pub fn has_version(&self, number: &str) -> bool {
        self.all_versions.iter().any(|version| version.number == number)
    }

    pub fn charts_for_version<'a>(&'a self, number: &'a str) -> impl Iterator<Item = &'a ChartVersion> {
        self.chart_versions
            .iter()
            .filter(move |chart| chart.app_version == number)
    }

    pub fn container_images_for_version(&self, number: &str) -> Option<&DockerVersionList> {
        self.docker_link_versions
            .iter()
            .find(|list| list.app_version == number)
    }

    /// Normalizes the record into the shape the update endpoint expects.
    ///
    /// The compatibility matrix is sent empty since the backend appends
    /// whatever it receives. Per-kind collections are left to the caller: the
    /// backend replaces each collection present in the payload.
    pub fn prep_for_update(&mut self) {
        self.compatibility_matrix.clear();

        if let Some(encryption) = self.encryption.as_mut() {
            for entry in encryption.list.drain(..) {
                encryption.hash.insert(entry, true);
            }
        }

        self.versions = self.all_versions.clone();
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Version {
    #[serde(rename = "versionnumber")]
    pub number: String,
    #[serde(rename = "versiondetails", default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(rename = "versioninstruction", default)]
    pub instructions: String,
    #[serde(rename = "createdon", default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<i64>,
    #[serde(rename = "haslimitedaccess", default)]
    pub has_limited_access: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    #[serde(rename = "isnewversion", default)]
    pub is_new_version: bool,
}

impl Version {
    pub fn new_pending(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            is_new_version: true,
            ..Default::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Repo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ChartVersion {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "appversion")]
    pub app_version: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub readme: String,
    #[serde(default)]
    pub repo: Repo,
    #[serde(rename = "isexternalurl", default)]
    pub is_external_url: bool,
    #[serde(rename = "tarurl", default)]
    pub tar_url: String,
    #[serde(rename = "helmtarurl", default, skip_serializing_if = "String::is_empty")]
    pub helm_tar_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(rename = "isupdatedinmarketplaceregistry", default)]
    pub is_updated_in_marketplace_registry: bool,
    #[serde(rename = "processingerror", default, skip_serializing_if = "String::is_empty")]
    pub processing_error: String,
    #[serde(rename = "downloadcount", default)]
    pub download_count: i64,
    #[serde(default)]
    pub size: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DockerVersionList {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "appversion")]
    pub app_version: String,
    #[serde(rename = "deploymentinstruction", default)]
    pub deployment_instruction: String,
    #[serde(rename = "dockerurls", default)]
    pub docker_urls: Vec<DockerUrlDetails>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
}

impl DockerVersionList {
    pub fn has_image_with_tag(&self, url: &str, tag: &str) -> bool {
        self.docker_urls
            .iter()
            .filter(|details| details.url == url)
            .any(|details| details.image_tags.iter().any(|t| t.tag == tag))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DockerUrlDetails {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    pub url: String,
    #[serde(rename = "imagetags", default)]
    pub image_tags: Vec<DockerImageTag>,
    #[serde(rename = "deploymentinstruction", default)]
    pub deployment_instruction: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TagType {
    #[default]
    Fixed,
    Floating,
}

impl std::str::FromStr for TagType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FIXED" => Ok(Self::Fixed),
            "FLOATING" => Ok(Self::Floating),
            _ => Err(format!("invalid tag type \"{}\", must be FIXED or FLOATING", s)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DockerImageTag {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub tag: String,
    #[serde(rename = "type", default)]
    pub tag_type: TagType,
    #[serde(rename = "isupdatedinmarketplaceregistry", default)]
    pub is_updated_in_marketplace_registry: bool,
    #[serde(rename = "marketplaces3link", default, skip_serializing_if = "String::is_empty")]
    pub marketplace_s3_link: String,
    #[serde(rename = "processingerror", default, skip_serializing_if = "String::is_empty")]
    pub processing_error: String,
    #[serde(rename = "downloadcount", default)]
    pub download_count: i64,
    #[serde(default)]
    pub size: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProductDeploymentFile {
    #[serde(rename = "fileid", default, skip_serializing_if = "String::is_empty")]
    pub file_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "imagetype", default, skip_serializing_if = "String::is_empty")]
    pub image_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(rename = "itemjson", default, skip_serializing_if = "String::is_empty")]
    pub item_json: String,
    #[serde(rename = "hashdigest", default)]
    pub hash_digest: String,
    #[serde(rename = "hashalgo", default)]
    pub hash_algo: String,
    #[serde(rename = "isthirdpartyurl", default)]
    pub is_third_party_url: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(rename = "downloadcount", default)]
    pub download_count: i64,
    #[serde(rename = "appversion")]
    pub app_version: String,
}

impl ProductDeploymentFile {
    /// Size of the file, falling back to the sum of the files listed in
    /// `itemjson` when the top-level size is missing.
    pub fn total_size(&self) -> i64 {
        match self.size {
            Some(size) if size > 0 => size,
            _ => serde_json::from_str::<DeploymentItem>(&self.item_json)
                .map(|item| item.total_size())
                .unwrap_or(0),
        }
    }
}

/// The structure embedded as a string in `itemjson`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct DeploymentItem {
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub files: Vec<DeploymentItem>,
}

impl DeploymentItem {
    fn total_size(&self) -> i64 {
        if self.files.is_empty() {
            self.size
        } else {
            self.files.iter().map(DeploymentItem::total_size).sum()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetaFileType {
    Cli,
    Config,
    Misc,
}

impl std::str::FromStr for MetaFileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CLI" => Ok(Self::Cli),
            "CONFIG" => Ok(Self::Config),
            "MISC" => Ok(Self::Misc),
            _ => Err(format!(
                "invalid metafile type \"{}\", must be one of cli, config, misc",
                s
            )),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MetaFile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "filetype")]
    pub file_type: MetaFileType,
    pub version: String,
    #[serde(rename = "appversion")]
    pub app_version: String,
    #[serde(rename = "metafileobjectsList", default)]
    pub objects: Vec<MetaFileObject>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MetaFileObject {
    #[serde(rename = "fileid", default, skip_serializing_if = "String::is_empty")]
    pub file_id: String,
    #[serde(rename = "filename")]
    pub file_name: String,
    #[serde(rename = "tempurl", default, skip_serializing_if = "String::is_empty")]
    pub temp_url: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "isfilebackedup", default)]
    pub is_file_backed_up: bool,
    #[serde(rename = "hashdigest", default)]
    pub hash_digest: String,
    #[serde(rename = "hashalgo", default)]
    pub hash_algo: String,
    #[serde(default)]
    pub size: i64,
    #[serde(rename = "downloadcount", default)]
    pub download_count: i64,
}

/// An "other" file attached to a product.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AddonFile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(rename = "hashdigest", default)]
    pub hash_digest: String,
    #[serde(rename = "hashalgo", default)]
    pub hash_algo: String,
    #[serde(default)]
    pub size: i64,
    #[serde(rename = "downloadcount", default)]
    pub download_count: i64,
    #[serde(rename = "appversion")]
    pub app_version: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EncryptionDetails {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list: Vec<String>,
    #[serde(default)]
    pub hash: HashMap<String, bool>,
}

/// Compliance artifact recorded on a product.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PcaDetails {
    pub url: String,
    pub version: String,
}

/// Identifies one downloadable item; only the fields of its kind are set.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadRequestPayload {
    #[serde(rename = "productid")]
    pub product_id: String,
    #[serde(rename = "appVersion")]
    pub app_version: String,
    #[serde(rename = "eulaAccepted")]
    pub eula_accepted: bool,
    #[serde(rename = "deploymentFileId", skip_serializing_if = "Option::is_none")]
    pub deployment_file_id: Option<String>,
    #[serde(rename = "chartVersion", skip_serializing_if = "Option::is_none")]
    pub chart_version: Option<String>,
    #[serde(rename = "dockerlinkVersionId", skip_serializing_if = "Option::is_none")]
    pub docker_link_version_id: Option<String>,
    #[serde(rename = "dockerUrlId", skip_serializing_if = "Option::is_none")]
    pub docker_url_id: Option<String>,
    #[serde(rename = "imageTagId", skip_serializing_if = "Option::is_none")]
    pub image_tag_id: Option<String>,
    #[serde(rename = "metafileid", skip_serializing_if = "Option::is_none")]
    pub meta_file_id: Option<String>,
    #[serde(rename = "metafileobjectid", skip_serializing_if = "Option::is_none")]
    pub meta_file_object_id: Option<String>,
    #[serde(rename = "isAddonFile", skip_serializing_if = "Option::is_none")]
    pub is_addon_file: Option<bool>,
    #[serde(rename = "addonFileId", skip_serializing_if = "Option::is_none")]
    pub addon_file_id: Option<String>,
}

impl DownloadRequestPayload {
    pub fn new(product_id: impl Into<String>, app_version: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            app_version: app_version.into(),
            ..Default::default()
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ResponseEnvelope<T> {
    pub response: T,
}

#[derive(Deserialize, Debug)]
pub struct ProductPayload {
    pub data: Product,
}

#[derive(Deserialize, Debug)]
pub struct ProductListPayload {
    #[serde(rename = "dataList", default)]
    pub products: Vec<Product>,
    #[serde(rename = "params", default)]
    pub params: ListParams,
}

#[derive(Deserialize, Debug, Default)]
pub struct ListParams {
    #[serde(rename = "totalCount", default)]
    pub total_count: usize,
}

#[derive(Deserialize, Debug)]
pub struct DownloadLinkPayload {
    #[serde(rename = "presignedurl")]
    pub presigned_url: String,
}

#[derive(Serialize, Debug)]
pub struct UploadUrlRequest<'a> {
    #[serde(rename = "filename")]
    pub file_name: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct UploadUrlPayload {
    #[serde(rename = "presignedurl")]
    pub presigned_url: String,
    #[serde(rename = "fileurl")]
    pub file_url: String,
    #[serde(rename = "filename")]
    pub file_name: String,
}
