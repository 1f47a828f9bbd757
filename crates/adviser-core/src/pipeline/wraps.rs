use super::config::ConfigReader;
use super::{PipelineUnit, UnitConfiguration, Wrap};
use crate::context::Context;
use crate::error::Result;
use crate::justification::Justification;
use crate::state::State;

/// Warns about every pinned release with a known CVE in an accepted stack.
pub struct CveWarningWrap {
    configuration: UnitConfiguration,
}

impl CveWarningWrap {
    pub const NAME: &'static str = "CveWarningWrap";

    pub fn new(configuration: UnitConfiguration) -> Result<Self> {
        ConfigReader::new(Self::NAME, &configuration, &[])?;
        Ok(Self { configuration })
    }
}

impl PipelineUnit for CveWarningWrap {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn configuration(&self) -> &UnitConfiguration {
        &self.configuration
    }
}

impl Wrap for CveWarningWrap {
    fn run(&mut self, context: &mut Context, state: &mut State) -> Result<()> {
        let mut records = Vec::new();
        for package_tuple in state.iter_resolved_dependencies() {
            let cves = context
                .knowledge_base()
                .cves(&package_tuple.name, &package_tuple.version)?
                .unwrap_or_default();
            for cve in cves {
                records.push(
                    Justification::warning(format!(
                        "Package {} in version {} is affected by {}",
                        package_tuple.name, package_tuple.version, cve.id
                    ))
                    .with_field("package_name", package_tuple.name.as_str())
                    .with_field("cve_id", cve.id),
                );
            }
        }
        state.add_justification(records);
        Ok(())
    }
}
