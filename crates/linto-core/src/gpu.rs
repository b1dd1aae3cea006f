//! GPU capacity advisory.
//!
//! Enumerates the GPU needs of the enabled services and compares them with
//! the slots the profile provides. Produces warnings only; nothing here
//! blocks a deployment.

use crate::model::{GpuMode, ProfileConfig, StreamingSttVariant};

/// GPU requirement for a single service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuRequirement {
    pub service_name: &'static str,
    pub slots_required: u32,
    /// Optional services fall back to CPU when no slot is available.
    pub optional: bool,
}

impl GpuRequirement {
    fn mandatory(service_name: &'static str) -> Self {
        GpuRequirement {
            service_name,
            slots_required: 1,
            optional: false,
        }
    }

    fn optional(service_name: &'static str) -> Self {
        GpuRequirement {
            service_name,
            slots_required: 1,
            optional: true,
        }
    }
}

/// Enabled services that use a GPU.
pub fn enabled_gpu_services(profile: &ProfileConfig) -> Vec<GpuRequirement> {
    let mut requirements = Vec::new();

    if profile.llm_enabled && profile.vllm_enabled {
        requirements.push(GpuRequirement::mandatory("vllm-service"));
    }

    if profile.live_session_enabled {
        for variant in &profile.streaming_stt_variants {
            match variant {
                StreamingSttVariant::NemoFrench => {
                    requirements.push(GpuRequirement::mandatory("stt-nemo-french-streaming"));
                }
                StreamingSttVariant::NemoEnglish => {
                    requirements.push(GpuRequirement::mandatory("stt-nemo-english-streaming"));
                }
                StreamingSttVariant::Kyutai => {
                    requirements.push(GpuRequirement::mandatory("stt-kyutai-streaming"));
                }
                StreamingSttVariant::Whisper => {
                    requirements.push(GpuRequirement::optional("stt-whisper-streaming"));
                }
                StreamingSttVariant::KaldiFrench => {}
            }
        }
    }

    if profile.stt_enabled {
        requirements.push(GpuRequirement::optional("stt-whisper-workers"));
        requirements.push(GpuRequirement::optional("diarization-pyannote"));
    }

    requirements
}

/// Total GPU slots the profile provides.
pub fn total_gpu_slots(profile: &ProfileConfig) -> u32 {
    match profile.gpu_mode {
        GpuMode::None => 0,
        GpuMode::Exclusive => profile.gpu_count,
        GpuMode::TimeSlicing => profile.gpu_count * profile.gpu_slices_per_gpu,
    }
}

/// Warning messages when GPU capacity looks insufficient. Empty when fine.
pub fn validate_gpu_capacity(profile: &ProfileConfig) -> Vec<String> {
    let requirements = enabled_gpu_services(profile);
    if requirements.is_empty() {
        return Vec::new();
    }

    let available = total_gpu_slots(profile);
    let required: u32 = requirements.iter().filter(|r| !r.optional).map(|r| r.slots_required).sum();
    let total: u32 = requirements.iter().map(|r| r.slots_required).sum();

    let mut warnings = Vec::new();

    if required > 0 && available == 0 {
        let services: Vec<_> = requirements
            .iter()
            .filter(|r| !r.optional)
            .map(|r| r.service_name)
            .collect();
        warnings.push(format!(
            "GPU required but not configured. Services requiring GPU: {}",
            services.join(", ")
        ));
    } else if required > available {
        let breakdown: Vec<_> = requirements
            .iter()
            .filter(|r| !r.optional)
            .map(|r| format!("{}: {}", r.service_name, r.slots_required))
            .collect();
        let slot_info = if profile.gpu_mode == GpuMode::TimeSlicing {
            format!("{} GPU x {} slices", profile.gpu_count, profile.gpu_slices_per_gpu)
        } else {
            format!("{} GPU", profile.gpu_count)
        };
        warnings.push(format!(
            "GPU Capacity Warning:\n  Required: {} GPU slots ({})\n  Available: {} slots ({})",
            required,
            breakdown.join(", "),
            available,
            slot_info
        ));
    } else if total > available && available > 0 {
        let optional: Vec<_> = requirements
            .iter()
            .filter(|r| r.optional)
            .map(|r| r.service_name)
            .collect();
        if !optional.is_empty() {
            warnings.push(format!(
                "Note: Some optional GPU services may run on CPU: {}",
                optional.join(", ")
            ));
        }
    }

    warnings
}

/// Whether any mandatory GPU service is enabled.
pub fn has_gpu_services(profile: &ProfileConfig) -> bool {
    enabled_gpu_services(profile).iter().any(|r| !r.optional)
}
