/// A note held in the registry. Times are seconds on the audio clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    /// Position in the scale
    pub id: i32,
    pub on: f64,
    pub off: f64,
    pub active: bool,
    pub channel: usize,
}

impl Default for Note {
    fn default() -> Self {
        Self {
            id: 0,
            on: 0.0,
            off: 0.0,
            active: false,
            channel: 0,
        }
    }
}

impl Note {
    /// A freshly struck note. `off` starts at `f64::MIN` so the note counts
    /// as held even when struck at clock time zero.
    pub fn new(id: i32, channel: usize, on: f64) -> Self {
        Self {
            id,
            on,
            off: f64::MIN,
            active: true,
            channel,
        }
    }

    /// Currently held (struck more recently than released)
    pub fn is_sounding(&self) -> bool {
        self.on > self.off
    }

    /// Has been let go at least once since the last strike
    pub fn is_released(&self) -> bool {
        self.off > self.on
    }
}
