//! Deploy stage: hand the selected environment to Ansible.

pub mod executor;

pub use executor::{AnsibleDeploy, DeployReport, run_deploy};
