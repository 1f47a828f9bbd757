use super::config::ConfigReader;
use super::{Boot, PipelineUnit, UnitConfiguration};
use crate::context::Context;
use crate::error::Result;
use crate::justification::Justification;

/// Records the runtime environment the stack is resolved for.
pub struct EnvironmentInfoBoot {
    configuration: UnitConfiguration,
}

impl EnvironmentInfoBoot {
    pub const NAME: &'static str = "EnvironmentInfoBoot";

    pub fn new(configuration: UnitConfiguration) -> Result<Self> {
        ConfigReader::new(Self::NAME, &configuration, &[])?;
        Ok(Self { configuration })
    }
}

impl PipelineUnit for EnvironmentInfoBoot {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn configuration(&self) -> &UnitConfiguration {
        &self.configuration
    }
}

impl Boot for EnvironmentInfoBoot {
    fn run(&mut self, context: &mut Context) -> Result<()> {
        let environment = context.runtime_environment().key();
        log::info!("Resolving stack for environment {}", environment);

        if context.runtime_environment().python_version.is_none() {
            context.stack_info.push(Justification::warning(
                "No Python version configured, releases are not checked against the interpreter",
            ));
        }

        context.stack_info.push(
            Justification::info(format!("Resolving stack for environment {}", environment))
                .with_field("os_name", environment.os_name.clone())
                .with_field("os_version", environment.os_version.clone())
                .with_field("python_version", environment.python_version.clone()),
        );
        Ok(())
    }
}
