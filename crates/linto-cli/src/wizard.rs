//! Interactive wizard for creating a deployment profile.
//!
//! Collects every profile field with dialoguer prompts, then validates and
//! saves through the profile store. The wizard is a thin field collector:
//! all rules live in `ProfileConfig::validate`.

use anyhow::Result;
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Password, Select};

use linto_core::model::{
    DeploymentBackend, GpuArchitecture, GpuMode, ProfileConfig, StreamingSttVariant, TlsMode,
};
use linto_core::store::ProfileStore;

pub struct WizardFlow {
    store: ProfileStore,
    theme: ColorfulTheme,
}

impl WizardFlow {
    pub fn new(store: ProfileStore) -> Self {
        WizardFlow {
            store,
            theme: ColorfulTheme::default(),
        }
    }

    /// Run the wizard to completion. Returns the saved profile, or None if
    /// the user backed out at the final confirmation.
    pub fn run(&self) -> Result<Option<ProfileConfig>> {
        println!();
        println!("{}", style("  LinTO Deployment Wizard").bold().cyan());
        println!();

        let mut profile = ProfileConfig::default();

        profile.name = Input::with_theme(&self.theme)
            .with_prompt("Profile name")
            .default(profile.name.clone())
            .interact_text()?;

        profile.domain = Input::with_theme(&self.theme)
            .with_prompt("Deployment domain")
            .default(profile.domain.clone())
            .interact_text()?;

        profile.backend = self.prompt_backend()?;
        self.prompt_features(&mut profile)?;

        profile.image_tag = Input::with_theme(&self.theme)
            .with_prompt("Default image tag")
            .default(profile.image_tag.clone())
            .interact_text()?;

        self.prompt_tls(&mut profile)?;

        if profile.backend == DeploymentBackend::K3s {
            self.prompt_k3s(&mut profile)?;
        }

        if profile.live_session_enabled {
            self.prompt_live_session(&mut profile)?;
        }

        if profile.llm_enabled {
            self.prompt_llm(&mut profile)?;
        }

        profile.super_admin_email = Input::with_theme(&self.theme)
            .with_prompt("Super admin email")
            .default(profile.super_admin_email.clone())
            .interact_text()?;

        self.prompt_smtp(&mut profile)?;
        self.prompt_oidc(&mut profile)?;

        profile.validate()?;

        self.print_summary(&profile);
        let confirmed = Confirm::with_theme(&self.theme)
            .with_prompt("Save this profile?")
            .default(true)
            .interact()?;
        if !confirmed {
            return Ok(None);
        }

        let path = self.store.save(&profile)?;
        println!(
            "{} {}",
            style("Profile saved to").green(),
            style(path.display()).bold()
        );
        Ok(Some(profile))
    }

    fn prompt_backend(&self) -> Result<DeploymentBackend> {
        let options = ["Docker Compose", "Docker Swarm", "Kubernetes (k3s)"];
        let selection = Select::with_theme(&self.theme)
            .with_prompt("Deployment backend")
            .items(&options)
            .default(0)
            .interact()?;
        Ok(match selection {
            1 => DeploymentBackend::Swarm,
            2 => DeploymentBackend::K3s,
            _ => DeploymentBackend::Compose,
        })
    }

    fn prompt_features(&self, profile: &mut ProfileConfig) -> Result<()> {
        let features = ["Studio", "STT (file transcription)", "Live Session", "LLM services"];
        let defaults = [true, true, false, false];
        let selection = MultiSelect::with_theme(&self.theme)
            .with_prompt("Services to deploy (space to toggle)")
            .items(&features)
            .defaults(&defaults)
            .interact()?;

        profile.studio_enabled = selection.contains(&0);
        profile.stt_enabled = selection.contains(&1);
        profile.live_session_enabled = selection.contains(&2);
        profile.llm_enabled = selection.contains(&3);
        Ok(())
    }

    fn prompt_tls(&self, profile: &mut ProfileConfig) -> Result<()> {
        let options = [
            "off (plain HTTP)",
            "mkcert (local development certs)",
            "acme (Let's Encrypt)",
            "custom (bring your own certs)",
        ];
        let selection = Select::with_theme(&self.theme)
            .with_prompt("TLS mode")
            .items(&options)
            .default(1)
            .interact()?;
        profile.tls_mode = match selection {
            0 => TlsMode::Off,
            2 => TlsMode::Acme,
            3 => TlsMode::Custom,
            _ => TlsMode::Mkcert,
        };

        match profile.tls_mode {
            TlsMode::Acme => {
                let email: String = Input::with_theme(&self.theme)
                    .with_prompt("ACME registration email")
                    .interact_text()?;
                profile.acme_email = Some(email);
            }
            TlsMode::Custom => {
                let cert: String = Input::with_theme(&self.theme)
                    .with_prompt("Path to TLS certificate (PEM)")
                    .interact_text()?;
                let key: String = Input::with_theme(&self.theme)
                    .with_prompt("Path to TLS private key (PEM)")
                    .interact_text()?;
                profile.custom_cert_path = Some(cert);
                profile.custom_key_path = Some(key);
            }
            _ => {}
        }
        Ok(())
    }

    fn prompt_k3s(&self, profile: &mut ProfileConfig) -> Result<()> {
        profile.k3s_namespace = Input::with_theme(&self.theme)
            .with_prompt("Kubernetes namespace")
            .default(profile.k3s_namespace.clone())
            .interact_text()?;

        let storage_class: String = Input::with_theme(&self.theme)
            .with_prompt("Storage class (empty for cluster default)")
            .allow_empty(true)
            .interact_text()?;
        if !storage_class.is_empty() {
            profile.k3s_storage_class = Some(storage_class);
        }

        if profile.tls_mode == TlsMode::Acme {
            profile.k3s_install_cert_manager = Confirm::with_theme(&self.theme)
                .with_prompt("Install cert-manager if missing?")
                .default(true)
                .interact()?;
        }

        profile.monitoring_enabled = Confirm::with_theme(&self.theme)
            .with_prompt("Install monitoring stack (Prometheus + Grafana)?")
            .default(false)
            .interact()?;

        let gpu_options = ["none", "exclusive (1 GPU per pod)", "time-slicing (shared GPUs)"];
        let selection = Select::with_theme(&self.theme)
            .with_prompt("GPU mode")
            .items(&gpu_options)
            .default(0)
            .interact()?;
        profile.gpu_mode = match selection {
            1 => GpuMode::Exclusive,
            2 => GpuMode::TimeSlicing,
            _ => GpuMode::None,
        };

        if profile.gpu_mode.enabled() {
            profile.gpu_count = Input::with_theme(&self.theme)
                .with_prompt("Number of GPUs")
                .default(profile.gpu_count)
                .interact_text()?;
            if profile.gpu_mode == GpuMode::TimeSlicing {
                profile.gpu_slices_per_gpu = Input::with_theme(&self.theme)
                    .with_prompt("Slices per GPU")
                    .default(profile.gpu_slices_per_gpu)
                    .interact_text()?;
            }
        }
        Ok(())
    }

    fn prompt_live_session(&self, profile: &mut ProfileConfig) -> Result<()> {
        let labels: Vec<&str> = StreamingSttVariant::ALL.iter().map(|v| v.as_str()).collect();
        let selection = MultiSelect::with_theme(&self.theme)
            .with_prompt("Streaming STT variants (space to toggle)")
            .items(&labels)
            .interact()?;
        profile.streaming_stt_variants = selection
            .into_iter()
            .map(|index| StreamingSttVariant::ALL[index])
            .collect();

        if profile.streaming_stt_variants.contains(&StreamingSttVariant::Kyutai) {
            let architectures = ["hopper (H100)", "ada (RTX 40xx)", "ampere (RTX 30xx, A100)"];
            let selection = Select::with_theme(&self.theme)
                .with_prompt("GPU architecture for Kyutai")
                .items(&architectures)
                .default(2)
                .interact()?;
            profile.kyutai_gpu_architecture = Some(match selection {
                0 => GpuArchitecture::Hopper,
                1 => GpuArchitecture::Ada,
                _ => GpuArchitecture::Ampere,
            });
        }

        profile.session_transcriber_replicas = Input::with_theme(&self.theme)
            .with_prompt("Session transcriber replicas")
            .default(profile.session_transcriber_replicas)
            .interact_text()?;
        Ok(())
    }

    fn prompt_llm(&self, profile: &mut ProfileConfig) -> Result<()> {
        profile.vllm_enabled = Confirm::with_theme(&self.theme)
            .with_prompt("Run a local vLLM service?")
            .default(false)
            .interact()?;

        if !profile.vllm_enabled {
            let base: String = Input::with_theme(&self.theme)
                .with_prompt("OpenAI-compatible API base (empty to configure later)")
                .allow_empty(true)
                .interact_text()?;
            if !base.is_empty() {
                profile.openai_api_base = Some(base);
                let token: String = Password::with_theme(&self.theme)
                    .with_prompt("API token (empty for none)")
                    .allow_empty_password(true)
                    .interact()?;
                if !token.is_empty() {
                    profile.openai_api_token = Some(token);
                }
            }
        }
        Ok(())
    }

    fn prompt_smtp(&self, profile: &mut ProfileConfig) -> Result<()> {
        profile.smtp_enabled = Confirm::with_theme(&self.theme)
            .with_prompt("Configure SMTP for outgoing mail?")
            .default(false)
            .interact()?;
        if !profile.smtp_enabled {
            return Ok(());
        }

        let host: String = Input::with_theme(&self.theme)
            .with_prompt("SMTP host")
            .interact_text()?;
        profile.smtp_host = Some(host);
        profile.smtp_port = Input::with_theme(&self.theme)
            .with_prompt("SMTP port")
            .default(profile.smtp_port)
            .interact_text()?;
        let auth: String = Input::with_theme(&self.theme)
            .with_prompt("SMTP auth user")
            .interact_text()?;
        profile.smtp_auth = Some(auth);
        let password: String = Password::with_theme(&self.theme)
            .with_prompt("SMTP password (empty for none)")
            .allow_empty_password(true)
            .interact()?;
        if !password.is_empty() {
            profile.smtp_password = Some(password);
        }
        let no_reply: String = Input::with_theme(&self.theme)
            .with_prompt("No-reply email address")
            .interact_text()?;
        profile.smtp_no_reply_email = Some(no_reply);
        Ok(())
    }

    fn prompt_oidc(&self, profile: &mut ProfileConfig) -> Result<()> {
        profile.oidc_google_enabled = Confirm::with_theme(&self.theme)
            .with_prompt("Enable Google sign-in?")
            .default(false)
            .interact()?;
        if profile.oidc_google_enabled {
            let id: String = Input::with_theme(&self.theme)
                .with_prompt("Google client ID")
                .interact_text()?;
            let secret: String = Password::with_theme(&self.theme)
                .with_prompt("Google client secret")
                .interact()?;
            profile.oidc_google_client_id = Some(id);
            profile.oidc_google_client_secret = Some(secret);
        }

        profile.oidc_github_enabled = Confirm::with_theme(&self.theme)
            .with_prompt("Enable GitHub sign-in?")
            .default(false)
            .interact()?;
        if profile.oidc_github_enabled {
            let id: String = Input::with_theme(&self.theme)
                .with_prompt("GitHub client ID")
                .interact_text()?;
            let secret: String = Password::with_theme(&self.theme)
                .with_prompt("GitHub client secret")
                .interact()?;
            profile.oidc_github_client_id = Some(id);
            profile.oidc_github_client_secret = Some(secret);
        }

        let native_options = ["none", "linagora", "eu"];
        let selection = Select::with_theme(&self.theme)
            .with_prompt("Native OIDC provider")
            .items(&native_options)
            .default(0)
            .interact()?;
        if selection > 0 {
            profile.oidc_native_type = Some(native_options[selection].to_string());
            let id: String = Input::with_theme(&self.theme)
                .with_prompt("Native OIDC client ID")
                .interact_text()?;
            let secret: String = Password::with_theme(&self.theme)
                .with_prompt("Native OIDC client secret")
                .interact()?;
            let url: String = Input::with_theme(&self.theme)
                .with_prompt("Native OIDC provider URL")
                .interact_text()?;
            profile.oidc_native_client_id = Some(id);
            profile.oidc_native_client_secret = Some(secret);
            profile.oidc_native_url = Some(url);
        }
        Ok(())
    }

    fn print_summary(&self, profile: &ProfileConfig) {
        println!();
        println!("{}", style("Profile summary").bold());
        let rows = [
            ("Name", profile.name.clone()),
            ("Domain", profile.domain.clone()),
            ("Backend", profile.backend.as_str().to_string()),
            ("Image tag", profile.image_tag.clone()),
            ("TLS mode", profile.tls_mode.as_str().to_string()),
            ("Services", profile.enabled_services().join(", ")),
            ("Admin email", profile.super_admin_email.clone()),
        ];
        for (label, value) in rows {
            println!("  {:<12} {}", style(label).cyan(), value);
        }
        println!();
    }
}
