// Fleet Infrastructure - File Adapters
// Implements: DeploymentStore, KeyStore; loads and writes ecosystem / deploy files

pub mod deploy_file;
pub mod deployment_store;
pub mod ecosystem_file;
pub mod key_gen;
pub mod key_store;
pub mod template_writer;

pub use deploy_file::{load_deploy_file, parse_deploy_file, LoadedDeployConfig};
pub use deployment_store::FileDeploymentStore;
pub use ecosystem_file::{
    ecosystem_to_string, load_ecosystem, parse_ecosystem, write_ecosystem, FileFormat,
};
pub use key_gen::generate_keys;
pub use key_store::FileKeyStore;
pub use template_writer::write_rendered;
