//! Database hooks.

use super::{PostProcessor, ProcessContext};
use crate::error::Result;
use crate::registry::RegistryBuilder;
use crate::resource::DiscoveredResource;
use crate::value::{AttrValue, Attributes};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub fn register(builder: &mut RegistryBuilder) -> Result<()> {
    builder.patch("oci_database_db_home", |hint| {
        hint.post_processor = Some(Arc::new(DbHomeProcessor));
    })?;
    Ok(())
}

/// Drops the db home created with the db system; it is configured inline.
#[derive(Debug, Clone, Copy)]
pub struct DbHomeProcessor;

#[async_trait]
impl PostProcessor for DbHomeProcessor {
    fn name(&self) -> &'static str {
        "db_home"
    }

    async fn retain(
        &self,
        ctx: &mut ProcessContext<'_>,
        resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        let db_system = ctx.parent()?;
        let primary = match db_system.attributes.get("db_home").and_then(AttrValue::as_list) {
            Some([AttrValue::Map(home), ..]) => home.get_str("id"),
            _ => None,
        };
        // Homes are only exported next to an inline home
        let Some(primary) = primary else {
            debug!(db_system = %db_system.id, skipped = resources.len(), "Db system has no inline db home");
            return Ok(Vec::new());
        };

        Ok(resources
            .into_iter()
            .filter(|home| {
                let keep = home.id != primary;
                if !keep {
                    debug!(id = %home.id, "Skipping primary db home");
                }
                keep
            })
            .collect())
    }
}
