//! Auxiliary output files and writing the export to disk.

use crate::error::{OciDiscoveryError, Result};
use crate::reference::Variables;
use crate::render::{quote, validate, HclWriter};
use crate::resource::DiscoveredResource;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// File holding the synthesized input variables.
pub const VARIABLES_FILE: &str = "vars.tf";

/// File holding the import blocks.
pub const IMPORT_FILE: &str = "import.tf";

/// One `variable` block per synthesized variable, in name order.
#[must_use]
pub fn render_variables(variables: &Variables) -> String {
    let mut writer = HclWriter::new();
    for (i, (name, default)) in variables.iter().enumerate() {
        if i > 0 {
            writer.blank_line();
        }
        writer.open_block("variable", &[name]);
        writer.raw_attribute("default", &quote(default));
        writer.close_block();
    }
    writer.finish()
}

/// One `import` block per rendered, importable resource, in discovery order.
#[must_use]
pub fn render_imports(resources: &[DiscoveredResource]) -> String {
    let mut writer = HclWriter::new();
    let mut first = true;
    for resource in resources
        .iter()
        .filter(|r| !r.omitted && r.renderer.is_importable() && !r.import_id().is_empty())
    {
        if !first {
            writer.blank_line();
        }
        first = false;
        writer.open_block("import", &[]);
        writer.raw_attribute("to", &resource.terraform_reference());
        writer.raw_attribute("id", &quote(resource.import_id()));
        writer.close_block();
    }
    writer.finish()
}

/// Parse every generated file back. Returns the total block count.
pub fn validate_files(files: &BTreeMap<String, String>) -> Result<usize> {
    let mut blocks = 0;
    for (name, text) in files {
        let count = validate(name, text)?;
        debug!(file = %name, blocks = count, "Validated generated file");
        blocks += count;
    }
    Ok(blocks)
}

/// Write the generated files into `dir`, creating it when missing.
pub async fn write_files(dir: &Path, files: &BTreeMap<String, String>) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| OciDiscoveryError::io(dir, e, file!(), line!()))?;

    for (name, text) in files {
        let path = dir.join(name);
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| OciDiscoveryError::io(&path, e, file!(), line!()))?;
        debug!(path = %path.display(), bytes = text.len(), "Wrote file");
    }
    info!(dir = %dir.display(), files = files.len(), "Wrote generated configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::AttrMap;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn resource(class: &str, name: &str, id: &str) -> DiscoveredResource {
        let mut resource = DiscoveredResource::new(id, class, AttrMap::new());
        resource.terraform_name = name.to_string();
        resource
    }

    #[test]
    fn test_render_variables() {
        let mut variables = Variables::new();
        variables.insert("web_source_image_id".to_string(), "ocid1.image.oc1..i".to_string());
        variables.insert("compartment_ocid".to_string(), "ocid1.compartment.oc1..c".to_string());

        assert_eq!(
            render_variables(&variables),
            "variable \"compartment_ocid\" {\n  default = \"ocid1.compartment.oc1..c\"\n}\n\n\
             variable \"web_source_image_id\" {\n  default = \"ocid1.image.oc1..i\"\n}\n"
        );
        assert_eq!(render_variables(&Variables::new()), "");
    }

    #[test]
    fn test_render_imports_skips_omitted() {
        let vcn = resource("oci_core_vcn", "main", "ocid1.vcn.oc1..v");
        let mut hidden = resource("oci_core_subnet", "hidden", "ocid1.subnet.oc1..h");
        hidden.omitted = true;
        let mut backend_set = resource("oci_load_balancer_backend_set", "bs1", "loadBalancers/lb/backendSets/bs1");
        backend_set.import_id = Some("loadBalancers/ocid1.loadbalancer.oc1..lb/backendSets/bs1".to_string());

        let text = render_imports(&[vcn, hidden, backend_set]);
        assert_eq!(
            text,
            "import {\n  to = oci_core_vcn.main\n  id = \"ocid1.vcn.oc1..v\"\n}\n\n\
             import {\n  to = oci_load_balancer_backend_set.bs1\n  id = \"loadBalancers/ocid1.loadbalancer.oc1..lb/backendSets/bs1\"\n}\n"
        );
        assert_eq!(validate("import.tf", &text).unwrap(), 2);
    }

    #[test]
    fn test_validate_files_reports_broken_file() {
        let mut files = BTreeMap::new();
        files.insert("core.tf".to_string(), "resource \"a\" \"b\" {\n  x = 1\n}\n".to_string());
        assert_eq!(validate_files(&files).unwrap(), 1);

        files.insert("broken.tf".to_string(), "resource \"a\" {\n".to_string());
        assert!(matches!(
            validate_files(&files),
            Err(OciDiscoveryError::RenderFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_write_files() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("out");
        let mut files = BTreeMap::new();
        files.insert("vars.tf".to_string(), "# empty\n".to_string());

        write_files(&dir, &files).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.join("vars.tf")).unwrap(), "# empty\n");
    }
}
