//! The control plane: one session controller driving one signal generator.

use respira_breath::{
    BreathingPattern, Phase, PatternCatalog, SessionController, StartOutcome, TimingMode,
};
use respira_engine::{AudioBackend, SignalGenerator, ThemeKind};

use crate::command::{Command, HELP};

/// What the main loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App<B: AudioBackend> {
    session: SessionController<SignalGenerator<B>>,
    catalog: PatternCatalog,
    pattern: BreathingPattern,
    last_shown: Option<(Phase, u32)>,
}

impl<B: AudioBackend> App<B> {
    pub fn new(
        generator: SignalGenerator<B>,
        timing: TimingMode,
        catalog: PatternCatalog,
        pattern: BreathingPattern,
    ) -> Self {
        Self {
            session: SessionController::new(generator).with_timing(timing),
            catalog,
            pattern,
            last_shown: None,
        }
    }

    pub fn session(&self) -> &SessionController<SignalGenerator<B>> {
        &self.session
    }

    fn generator(&mut self) -> &mut SignalGenerator<B> {
        self.session.observer_mut()
    }

    /// Start (or resume) the selected pattern.
    pub fn start(&mut self) {
        match self.session.start(&self.pattern) {
            Ok(StartOutcome::Started) => {
                println!(
                    "{}: {} ({} cycles, {:.0}s)",
                    self.pattern.name,
                    self.pattern.description,
                    self.pattern.cycle_count,
                    self.pattern.session_seconds()
                );
                self.show_phase();
            }
            Ok(StartOutcome::Resumed) => println!("resumed"),
            Err(e) => log::error!("{e}"),
        }
    }

    pub fn handle(&mut self, cmd: Command) -> Flow {
        match cmd {
            Command::Start(key) => {
                if let Some(key) = key {
                    match self.catalog.lookup(&key) {
                        Ok(p) => self.pattern = p.clone(),
                        Err(e) => {
                            log::warn!("{e}");
                            return Flow::Continue;
                        }
                    }
                }
                self.start();
            }
            Command::Pause => {
                if self.session.pause() {
                    println!("paused");
                }
            }
            Command::Resume => {
                if !self.session.resume() {
                    log::warn!("nothing to resume");
                }
            }
            Command::Reset => {
                self.session.reset();
                self.last_shown = None;
                println!("{}", Phase::Ready.instruction());
            }
            Command::Volume(v) => {
                if self.generator().set_volume(v).is_ok() {
                    println!("volume {v:.2}");
                }
            }
            Command::Theme(theme) => self.select_theme(theme),
            Command::Mute => {
                self.generator().mute();
                println!("muted");
            }
            Command::Unmute => match self.generator().unmute() {
                Ok(()) => println!("unmuted"),
                Err(e) => log::warn!("{e}"),
            },
            Command::Status => self.print_status(),
            Command::Patterns => {
                for p in self.catalog.iter() {
                    println!(
                        "  {:<8} {:<18} {:>2} cycles, {:.1} breaths/min",
                        p.key,
                        p.name,
                        p.cycle_count,
                        p.breaths_per_minute()
                    );
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn select_theme(&mut self, theme: ThemeKind) {
        match self.generator().select_theme(theme) {
            Ok(()) => println!("theme {theme}"),
            Err(e) => log::warn!("{e}"),
        }
    }

    /// Advance the session and the voice LFOs; prints on phase entry and on
    /// each new countdown second.
    pub fn tick(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let entered = self.session.tick(dt).is_some();
        self.generator().advance(dt);
        if entered {
            self.show_phase();
        } else if self.session.is_running() {
            let shown = (self.session.phase(), self.session.display_seconds());
            if self.last_shown != Some(shown) {
                self.last_shown = Some(shown);
                log::debug!("{} {}s", shown.0, shown.1);
            }
        }
    }

    fn show_phase(&mut self) {
        let s = &self.session;
        let phase = s.phase();
        self.last_shown = Some((phase, s.display_seconds()));
        match s.cycle_label() {
            Some(label) => println!(
                "[{label}] {:<16} {:>2}s  {}",
                phase.as_str(),
                s.display_seconds(),
                phase.instruction()
            ),
            None => println!("{}", phase.instruction()),
        }
    }

    fn print_status(&self) {
        let s = &self.session;
        let g = s.observer();
        println!(
            "{} | {}s left | {} | {:.0}% | {} | volume {:.2} | {}",
            s.phase(),
            s.display_seconds(),
            s.cycle_label().unwrap_or_else(|| "-".into()),
            s.session_progress() * 100.0,
            if s.is_running() { "running" } else { "paused" },
            g.master_volume(),
            match g.playing_theme() {
                Some(t) => t.to_string(),
                None => format!("{} (silent)", g.selected_theme()),
            },
        );
    }

    pub fn is_complete(&self) -> bool {
        self.session.phase() == Phase::Complete
    }
}
