pub mod beam;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod justification;
pub mod knowledge;
pub mod package;
pub mod pipeline;
pub mod predictor;
pub mod product;
pub mod project;
pub mod resolver;
pub mod state;

pub use beam::Beam;
pub use config::{AdviserConfig, ConfigLoader, DecisionType, PredictorConfig, RecommendationType};
pub use context::{Context, ContextParams};
pub use environment::{EnvironmentKey, RuntimeEnvironment};
pub use error::{AdviserError, Result};
pub use justification::{Justification, JustificationType};
pub use knowledge::{CveRecord, InMemoryKnowledgeBase, KnowledgeBase, SolverStatus};
pub use package::{PackageTuple, PackageVersion, Requirement};
pub use pipeline::{Pipeline, PipelineBuilder, UnitKind};
pub use predictor::Predictor;
pub use product::{Product, Report};
pub use project::Project;
pub use resolver::{advise, Resolver};
pub use state::{State, StateId};
