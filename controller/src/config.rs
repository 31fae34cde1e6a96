use codeloom_common::args::CodespaceArgs;
use codeloom_types::PortMapping;

/// Static parameters used to derive every student's `JobParams`.
#[derive(Debug, Clone)]
pub struct CodespaceConfig {
    pub image: String,
    pub namespace: String,
    pub ports: Vec<PortMapping>,
}

impl From<&CodespaceArgs> for CodespaceConfig {
    fn from(args: &CodespaceArgs) -> Self {
        Self {
            image: args.codespace_image.clone(),
            namespace: args.codespace_namespace.clone(),
            ports: vec![
                PortMapping::tcp("ide", 80, 443),
                PortMapping::tcp("vnc", 5900, 5900),
                PortMapping::tcp("ssh", 22, 22),
            ],
        }
    }
}
