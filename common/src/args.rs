use clap::Parser;

#[derive(Parser, Debug, Clone)]
pub struct RedisArgs {
    #[arg(long, env = "REDIS_HOST", default_value = "127.0.0.1")]
    pub redis_host: String,

    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    pub redis_port: u16,

    #[arg(long, env = "REDIS_USERNAME")]
    pub redis_username: Option<String>,

    #[arg(long, env = "REDIS_PASSWORD")]
    pub redis_password: Option<String>,

    #[arg(long, env = "REDIS_PROTO", default_value = "redis")]
    pub redis_proto: String,
}

impl RedisArgs {
    pub fn url_redacted(&self) -> String {
        format!(
            "{}://{}:{}@{}:{}",
            if self.redis_proto.is_empty() {
                "redis"
            } else {
                &self.redis_proto
            },
            self.redis_username.as_deref().unwrap_or(""),
            self.redis_password.as_deref().map(|_| "****").unwrap_or(""),
            self.redis_host,
            self.redis_port
        )
    }

    pub fn url(&self) -> String {
        let proto = if self.redis_proto.is_empty() {
            "redis"
        } else {
            &self.redis_proto
        };
        let mut url = format!("{}://", proto);
        if let Some(ref username) = self.redis_username {
            url.push_str(username);
            if let Some(ref password) = self.redis_password {
                url.push(':');
                url.push_str(password);
            }
            url.push('@');
        } else if let Some(ref password) = self.redis_password {
            url.push(':');
            url.push_str(password);
            url.push('@');
        }
        url.push_str(&format!("{}:{}/", self.redis_host, self.redis_port));
        url
    }
}

/// Arguments shared by every binary that needs to mint or verify
/// student API tokens (see `codeloom_auth`).
#[derive(Parser, Debug, Clone)]
pub struct TokenArgs {
    /// Exactly 32 bytes, UTF-8, used to key the token codec.
    #[arg(long, env = "API_KEY_SECRET")]
    pub api_key_secret: String,
}

/// Arguments shared by every binary that needs to reach the student
/// directory tree and archive (see `codeloom_store`).
#[derive(Parser, Debug, Clone)]
pub struct StudentDirArgs {
    #[arg(long, env = "STUDENTS_DIR", default_value = "./running/io/students")]
    pub students_dir: String,

    #[arg(
        long,
        env = "ARCHIVE_STUDENTS_DIR",
        default_value = "./running/io/archive-students"
    )]
    pub archive_students_dir: String,
}

/// Arguments describing the codespace image and cluster namespace,
/// shared between the controller and the orchestrator adapter.
#[derive(Parser, Debug, Clone)]
pub struct CodespaceArgs {
    #[arg(long, env = "CODESPACE_IMAGE", default_value = "codespace-base:latest")]
    pub codespace_image: String,

    #[arg(long, env = "CODESPACE_NAMESPACE", default_value = "codespaces")]
    pub codespace_namespace: String,

    #[arg(long, env = "MOCK_ORCHESTRATOR", default_value_t = false)]
    pub mock_orchestrator: bool,
}
