//! Publication metadata.
//!
//! Publication fields come from a flat property map in the config file
//! (`GROUP`, `VERSION_NAME`, `POM_*`), mirroring the property files release
//! pipelines already maintain. Group, version, and artifact id are required;
//! everything else is optional POM decoration.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

pub const PROP_GROUP: &str = "GROUP";
pub const PROP_VERSION_NAME: &str = "VERSION_NAME";
pub const PROP_POM_ARTIFACT_ID: &str = "POM_ARTIFACT_ID";
pub const PROP_POM_PACKAGING: &str = "POM_PACKAGING";
pub const PROP_POM_NAME: &str = "POM_NAME";
pub const PROP_POM_DESCRIPTION: &str = "POM_DESCRIPTION";
pub const PROP_POM_URL: &str = "POM_URL";
pub const PROP_POM_SCM_URL: &str = "POM_SCM_URL";
pub const PROP_POM_SCM_CONNECTION: &str = "POM_SCM_CONNECTION";
pub const PROP_POM_SCM_DEV_CONNECTION: &str = "POM_SCM_DEV_CONNECTION";
pub const PROP_POM_LICENCE_NAME: &str = "POM_LICENCE_NAME";
pub const PROP_POM_LICENCE_URL: &str = "POM_LICENCE_URL";
pub const PROP_POM_DEVELOPER_ID: &str = "POM_DEVELOPER_ID";
pub const PROP_POM_DEVELOPER_NAME: &str = "POM_DEVELOPER_NAME";

const DEFAULT_PACKAGING: &str = "jar";
const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// What gets published: coordinates plus POM fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub group: String,
    pub artifact_id: String,
    pub version: String,
    pub packaging: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub scm_url: Option<String>,
    pub scm_connection: Option<String>,
    pub scm_dev_connection: Option<String>,
    pub licence_name: Option<String>,
    pub licence_url: Option<String>,
    pub developer_id: Option<String>,
    pub developer_name: Option<String>,
}

impl Publication {
    /// Build a publication from the property map.
    pub fn from_properties(properties: &BTreeMap<String, String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            properties
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .with_context(|| format!("missing required publication property '{key}'"))
        };
        let optional = |key: &str| -> Option<String> {
            properties
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            group: required(PROP_GROUP)?,
            artifact_id: required(PROP_POM_ARTIFACT_ID)?,
            version: required(PROP_VERSION_NAME)?,
            packaging: optional(PROP_POM_PACKAGING).unwrap_or_else(|| DEFAULT_PACKAGING.to_string()),
            name: optional(PROP_POM_NAME),
            description: optional(PROP_POM_DESCRIPTION),
            url: optional(PROP_POM_URL),
            scm_url: optional(PROP_POM_SCM_URL),
            scm_connection: optional(PROP_POM_SCM_CONNECTION),
            scm_dev_connection: optional(PROP_POM_SCM_DEV_CONNECTION),
            licence_name: optional(PROP_POM_LICENCE_NAME),
            licence_url: optional(PROP_POM_LICENCE_URL),
            developer_id: optional(PROP_POM_DEVELOPER_ID),
            developer_name: optional(PROP_POM_DEVELOPER_NAME),
        })
    }

    /// Snapshot versions may only go to the snapshot repository, and the
    /// snapshot repository only accepts them.
    pub fn is_snapshot_version(&self) -> bool {
        self.version.ends_with(SNAPSHOT_SUFFIX)
    }

    /// File name of an artifact belonging to this publication.
    pub fn file_name(&self, classifier: Option<&str>, extension: &str) -> String {
        match classifier {
            Some(c) if !c.is_empty() => {
                format!("{}-{}-{c}.{extension}", self.artifact_id, self.version)
            }
            _ => format!("{}-{}.{extension}", self.artifact_id, self.version),
        }
    }

    /// Render the POM document. Output is deterministic.
    pub fn render_pom(&self) -> String {
        let mut pom = String::with_capacity(1024);
        pom.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        pom.push_str(
            "<project xmlns=\"http://maven.apache.org/POM/4.0.0\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xsi:schemaLocation=\"http://maven.apache.org/POM/4.0.0 \
             http://maven.apache.org/xsd/maven-4.0.0.xsd\">\n",
        );
        pom.push_str("  <modelVersion>4.0.0</modelVersion>\n");

        element(&mut pom, 1, "groupId", &self.group);
        element(&mut pom, 1, "artifactId", &self.artifact_id);
        element(&mut pom, 1, "version", &self.version);
        element(&mut pom, 1, "packaging", &self.packaging);

        optional_element(&mut pom, 1, "name", self.name.as_deref());
        optional_element(&mut pom, 1, "description", self.description.as_deref());
        optional_element(&mut pom, 1, "url", self.url.as_deref());

        if self.scm_url.is_some() || self.scm_connection.is_some() || self.scm_dev_connection.is_some()
        {
            pom.push_str("  <scm>\n");
            optional_element(&mut pom, 2, "url", self.scm_url.as_deref());
            optional_element(&mut pom, 2, "connection", self.scm_connection.as_deref());
            optional_element(
                &mut pom,
                2,
                "developerConnection",
                self.scm_dev_connection.as_deref(),
            );
            pom.push_str("  </scm>\n");
        }

        if self.licence_name.is_some() || self.licence_url.is_some() {
            pom.push_str("  <licenses>\n    <license>\n");
            optional_element(&mut pom, 3, "name", self.licence_name.as_deref());
            optional_element(&mut pom, 3, "url", self.licence_url.as_deref());
            pom.push_str("    </license>\n  </licenses>\n");
        }

        if self.developer_id.is_some() || self.developer_name.is_some() {
            pom.push_str("  <developers>\n    <developer>\n");
            optional_element(&mut pom, 3, "id", self.developer_id.as_deref());
            optional_element(&mut pom, 3, "name", self.developer_name.as_deref());
            pom.push_str("    </developer>\n  </developers>\n");
        }

        pom.push_str("</project>\n");
        pom
    }
}

fn element(out: &mut String, depth: usize, tag: &str, value: &str) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push('<');
    out.push_str(tag);
    out.push('>');
    out.push_str(&xml_escape(value));
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}

fn optional_element(out: &mut String, depth: usize, tag: &str, value: Option<&str>) {
    if let Some(value) = value {
        element(out, depth, tag, value);
    }
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_properties() -> BTreeMap<String, String> {
        BTreeMap::from([
            (PROP_GROUP.to_string(), "com.example".to_string()),
            (PROP_POM_ARTIFACT_ID.to_string(), "widget".to_string()),
            (PROP_VERSION_NAME.to_string(), "3.0.0-SNAPSHOT".to_string()),
        ])
    }

    #[test]
    fn minimal_properties_build_a_publication() {
        let publication = Publication::from_properties(&minimal_properties()).expect("publication");
        assert_eq!(publication.group, "com.example");
        assert_eq!(publication.artifact_id, "widget");
        assert_eq!(publication.version, "3.0.0-SNAPSHOT");
        assert_eq!(publication.packaging, "jar");
        assert!(publication.is_snapshot_version());
    }

    #[test]
    fn missing_required_property_is_an_error() {
        let mut props = minimal_properties();
        props.remove(PROP_GROUP);

        let err = Publication::from_properties(&props).expect_err("must fail");
        assert!(err.to_string().contains(PROP_GROUP));
    }

    #[test]
    fn blank_required_property_is_an_error() {
        let mut props = minimal_properties();
        props.insert(PROP_VERSION_NAME.to_string(), "  ".to_string());

        assert!(Publication::from_properties(&props).is_err());
    }

    #[test]
    fn release_versions_are_not_snapshots() {
        let mut props = minimal_properties();
        props.insert(PROP_VERSION_NAME.to_string(), "3.0.0".to_string());

        let publication = Publication::from_properties(&props).expect("publication");
        assert!(!publication.is_snapshot_version());
    }

    #[test]
    fn file_name_includes_classifier_when_present() {
        let publication = Publication::from_properties(&minimal_properties()).expect("publication");
        assert_eq!(
            publication.file_name(None, "jar"),
            "widget-3.0.0-SNAPSHOT.jar"
        );
        assert_eq!(
            publication.file_name(Some("sources"), "jar"),
            "widget-3.0.0-SNAPSHOT-sources.jar"
        );
    }

    #[test]
    fn pom_contains_coordinates_and_optional_sections() {
        let mut props = minimal_properties();
        props.insert(PROP_POM_NAME.to_string(), "Widget".to_string());
        props.insert(
            PROP_POM_DESCRIPTION.to_string(),
            "A demo widget".to_string(),
        );
        props.insert(
            PROP_POM_SCM_URL.to_string(),
            "https://github.com/example/widget".to_string(),
        );
        props.insert(PROP_POM_LICENCE_NAME.to_string(), "MIT".to_string());
        props.insert(PROP_POM_DEVELOPER_ID.to_string(), "example".to_string());

        let pom = Publication::from_properties(&props)
            .expect("publication")
            .render_pom();

        assert!(pom.contains("<groupId>com.example</groupId>"));
        assert!(pom.contains("<artifactId>widget</artifactId>"));
        assert!(pom.contains("<version>3.0.0-SNAPSHOT</version>"));
        assert!(pom.contains("<packaging>jar</packaging>"));
        assert!(pom.contains("<name>Widget</name>"));
        assert!(pom.contains("<scm>"));
        assert!(pom.contains("<license>"));
        assert!(pom.contains("<developer>"));
    }

    #[test]
    fn pom_omits_absent_sections() {
        let pom = Publication::from_properties(&minimal_properties())
            .expect("publication")
            .render_pom();

        assert!(!pom.contains("<scm>"));
        assert!(!pom.contains("<licenses>"));
        assert!(!pom.contains("<developers>"));
    }

    #[test]
    fn pom_escapes_xml_metacharacters() {
        let mut props = minimal_properties();
        props.insert(
            PROP_POM_DESCRIPTION.to_string(),
            "Widgets & <gadgets>".to_string(),
        );

        let pom = Publication::from_properties(&props)
            .expect("publication")
            .render_pom();
        assert!(pom.contains("Widgets &amp; &lt;gadgets&gt;"));
    }

    #[test]
    fn render_is_deterministic() {
        let publication = Publication::from_properties(&minimal_properties()).expect("publication");
        assert_eq!(publication.render_pom(), publication.render_pom());
    }
}
