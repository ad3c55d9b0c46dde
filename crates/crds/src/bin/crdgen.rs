//! Generates the Project CRD manifest as yaml on stdout.

use crds::Project;
use kube::CustomResourceExt;

fn main() {
    match serde_yaml::to_string(&Project::crd()) {
        Ok(yaml) => print!("{yaml}"),
        Err(e) => {
            eprintln!("failed to render Project CRD: {e}");
            std::process::exit(1);
        }
    }
}
