use super::state::Quality;

/// Keys the player reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Space,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    KeyM,
    KeyF,
    Other,
}

impl KeyCode {
    /// Map a DOM `KeyboardEvent.code` value.
    pub fn from_code(code: &str) -> Self {
        match code {
            "Space" => KeyCode::Space,
            "ArrowLeft" => KeyCode::ArrowLeft,
            "ArrowRight" => KeyCode::ArrowRight,
            "ArrowUp" => KeyCode::ArrowUp,
            "ArrowDown" => KeyCode::ArrowDown,
            "KeyM" => KeyCode::KeyM,
            "KeyF" => KeyCode::KeyF,
            _ => KeyCode::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerMessage {
    // Media element events
    LoadStart,
    LoadedMetadata { duration: f64 },
    TimeUpdate { current_time: f64 },
    /// Buffered `(start, end)` ranges in seconds, in element order.
    Progress { buffered: Vec<(f64, f64)> },
    CanPlay,
    LoadedData,
    Waiting,
    Stalled,
    Suspend,
    Played,
    Paused,
    MediaError,

    // Source and adapter outcomes
    SourceFailed,
    StreamFault,

    // User intents
    TogglePlay,
    Seek(f64),
    Skip(f64),
    SetVolume(f64),
    StepVolume(f64),
    ToggleMute,
    ToggleFullscreen,
    SetSpeed(f64),
    SelectQuality(Quality),
    Retry,
    PointerMoved,
    PointerLeft,
    FocusChanged(bool),
    Key(KeyCode),

    // Environment
    FullscreenChanged(bool),
    /// Clock tick; fires any deadline at or before `now`.
    Tick,
    /// Progress-save cadence.
    SaveTick,
}

/// Side effects requested by the reducer, executed against the ports.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Seek(f64),
    /// Element volume, `0.0..=1.0`.
    SetVolume(f64),
    SetMuted(bool),
    SetRate(f64),
    RequestFullscreen,
    ExitFullscreen,
    /// Re-assign the current source.
    Reload,
    SaveProgress { current_time: f64, duration: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_codes() {
        assert_eq!(KeyCode::from_code("Space"), KeyCode::Space);
        assert_eq!(KeyCode::from_code("KeyM"), KeyCode::KeyM);
        assert_eq!(KeyCode::from_code("KeyF"), KeyCode::KeyF);
        assert_eq!(KeyCode::from_code("KeyK"), KeyCode::Other);
    }
}
