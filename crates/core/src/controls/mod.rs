use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::PlaybackState;

/// Discrete input delivered to a session by buttons, hotkeys, menus or a
/// replay script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Input {
    TogglePlay,
    Play,
    Pause,
    Stop,
    StepBack,
    StepForward,
    Skip,
    Increase,
    Decrease,
    Release,
    AddMarker,
    Scrub { value: u32 },
    SetRange { lower: i32, upper: i32 },
    Save,
    SaveAs { path: PathBuf },
    DeleteData { confirmed: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    Play,
    Pause,
    StepBack,
    Stop,
    StepForward,
    Increase,
    Decrease,
    Skip,
    Marker,
    Save,
    Slider,
}

/// Facts the enablement predicates are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlContext {
    pub playback: PlaybackState,
}

impl ControlContext {
    pub fn new(playback: PlaybackState) -> Self {
        Self { playback }
    }

    pub fn has_media(&self) -> bool {
        self.playback != PlaybackState::NoMedia
    }

    pub fn is_playing(&self) -> bool {
        self.playback == PlaybackState::Playing
    }
}

/// Static description of one on-screen control.
#[derive(Clone)]
pub struct ControlSpec {
    pub control: Control,
    pub label: &'static str,
    pub hotkeys: &'static [&'static str],
    /// Held controls fire repeatedly.
    pub auto_repeat: bool,
    pub enabled_when: fn(&ControlContext) -> bool,
    pub on_press: Input,
    pub on_release: Option<Input>,
}

impl std::fmt::Debug for ControlSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlSpec")
            .field("control", &self.control)
            .field("label", &self.label)
            .field("hotkeys", &self.hotkeys)
            .field("auto_repeat", &self.auto_repeat)
            .finish()
    }
}

fn has_media(ctx: &ControlContext) -> bool {
    ctx.has_media()
}

fn can_play(ctx: &ControlContext) -> bool {
    ctx.has_media() && !ctx.is_playing()
}

fn is_playing(ctx: &ControlContext) -> bool {
    ctx.is_playing()
}

pub const CONTROLS: &[ControlSpec] = &[
    ControlSpec {
        control: Control::Play,
        label: "Play",
        hotkeys: &["Space"],
        auto_repeat: false,
        enabled_when: can_play,
        on_press: Input::TogglePlay,
        on_release: None,
    },
    ControlSpec {
        control: Control::Pause,
        label: "Pause",
        hotkeys: &["Space"],
        auto_repeat: false,
        enabled_when: is_playing,
        on_press: Input::TogglePlay,
        on_release: None,
    },
    ControlSpec {
        control: Control::StepBack,
        label: "Back 1s",
        hotkeys: &["Left"],
        auto_repeat: true,
        enabled_when: has_media,
        on_press: Input::StepBack,
        on_release: None,
    },
    ControlSpec {
        control: Control::Stop,
        label: "Stop",
        hotkeys: &[],
        auto_repeat: false,
        enabled_when: has_media,
        on_press: Input::Stop,
        on_release: None,
    },
    ControlSpec {
        control: Control::StepForward,
        label: "Forward 1s",
        hotkeys: &["Right"],
        auto_repeat: true,
        enabled_when: has_media,
        on_press: Input::StepForward,
        on_release: None,
    },
    ControlSpec {
        control: Control::Increase,
        label: "Increase",
        hotkeys: &["Up"],
        auto_repeat: true,
        enabled_when: is_playing,
        on_press: Input::Increase,
        on_release: Some(Input::Release),
    },
    ControlSpec {
        control: Control::Decrease,
        label: "Decrease",
        hotkeys: &["Down"],
        auto_repeat: true,
        enabled_when: is_playing,
        on_press: Input::Decrease,
        on_release: Some(Input::Release),
    },
    ControlSpec {
        control: Control::Skip,
        label: "Skip",
        hotkeys: &[],
        auto_repeat: false,
        enabled_when: has_media,
        on_press: Input::Skip,
        on_release: None,
    },
    ControlSpec {
        control: Control::Marker,
        label: "Marker",
        hotkeys: &["Enter", "Return"],
        auto_repeat: false,
        enabled_when: is_playing,
        on_press: Input::AddMarker,
        on_release: None,
    },
    ControlSpec {
        control: Control::Save,
        label: "Save",
        hotkeys: &["Ctrl+S"],
        auto_repeat: false,
        enabled_when: has_media,
        on_press: Input::Save,
        on_release: None,
    },
];

/// Enabled flag of a control after evaluating its predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlStatus {
    pub control: Control,
    pub enabled: bool,
}

pub fn spec_for(control: Control) -> Option<&'static ControlSpec> {
    CONTROLS.iter().find(|spec| spec.control == control)
}

/// First enabled control bound to `hotkey`, so shared keys such as `Space`
/// resolve to whichever of play/pause is currently active.
pub fn control_for_hotkey(hotkey: &str, ctx: &ControlContext) -> Option<Control> {
    CONTROLS
        .iter()
        .filter(|spec| spec.hotkeys.iter().any(|key| key.eq_ignore_ascii_case(hotkey)))
        .find(|spec| (spec.enabled_when)(ctx))
        .map(|spec| spec.control)
}

/// Evaluates every control in the table plus the position slider.
pub fn control_states(ctx: &ControlContext) -> Vec<ControlStatus> {
    CONTROLS
        .iter()
        .map(|spec| ControlStatus {
            control: spec.control,
            enabled: (spec.enabled_when)(ctx),
        })
        .chain(std::iter::once(ControlStatus {
            control: Control::Slider,
            enabled: ctx.has_media(),
        }))
        .collect()
}

pub fn is_enabled(control: Control, ctx: &ControlContext) -> bool {
    match spec_for(control) {
        Some(spec) => (spec.enabled_when)(ctx),
        None => ctx.has_media(),
    }
}
