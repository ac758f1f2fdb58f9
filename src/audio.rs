//! Fire-and-forget cue playback plus the looping music channel. Cues are
//! requested by event; a missing bank or clip degrades to silence, never an
//! error.

use bevy::audio::{AudioSink, PlaybackSettings, Volume};
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    Win,
    Death,
    Warning,
    PanelOpen,
    ButtonClick,
    Checkpoint,
}

/// Ask the audio layer to play a one-shot cue.
#[derive(Event, Debug, Clone, Copy)]
pub struct PlayCue(pub CueKind);

#[derive(Resource, Clone)]
pub struct AudioSettings {
    pub music_volume: f32,
    pub sfx_volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            music_volume: 0.5,
            sfx_volume: 0.7,
        }
    }
}

#[derive(Resource)]
struct CueBank {
    win: Handle<AudioSource>,
    death: Handle<AudioSource>,
    warning: Handle<AudioSource>,
    panel_open: Handle<AudioSource>,
    button_click: Handle<AudioSource>,
    checkpoint: Handle<AudioSource>,
}

impl CueBank {
    fn get(&self, kind: CueKind) -> Handle<AudioSource> {
        match kind {
            CueKind::Win => self.win.clone(),
            CueKind::Death => self.death.clone(),
            CueKind::Warning => self.warning.clone(),
            CueKind::PanelOpen => self.panel_open.clone(),
            CueKind::ButtonClick => self.button_click.clone(),
            CueKind::Checkpoint => self.checkpoint.clone(),
        }
    }
}

#[derive(Component)]
struct MusicChannel;

fn setup_audio(mut commands: Commands, assets: Res<AssetServer>, settings: Res<AudioSettings>) {
    commands.insert_resource(CueBank {
        win: assets.load("audio/win.wav"),
        death: assets.load("audio/death.wav"),
        warning: assets.load("audio/warning.wav"),
        panel_open: assets.load("audio/panel_open.wav"),
        button_click: assets.load("audio/button_click.wav"),
        checkpoint: assets.load("audio/checkpoint.wav"),
    });
    commands.spawn((
        AudioBundle {
            source: assets.load("audio/music_loop.wav"),
            settings: PlaybackSettings::LOOP.with_volume(Volume::new(settings.music_volume)),
        },
        MusicChannel,
    ));
}

fn play_cues(
    mut commands: Commands,
    mut events: EventReader<PlayCue>,
    bank: Option<Res<CueBank>>,
    settings: Res<AudioSettings>,
) {
    let Some(bank) = bank else {
        events.clear();
        return;
    };
    for &PlayCue(kind) in events.read() {
        debug!("cue: {kind:?}");
        commands.spawn(AudioBundle {
            source: bank.get(kind),
            settings: PlaybackSettings::DESPAWN.with_volume(Volume::new(settings.sfx_volume)),
        });
    }
}

fn sync_music_volume(
    settings: Res<AudioSettings>,
    music: Query<&AudioSink, With<MusicChannel>>,
) {
    if !settings.is_changed() {
        return;
    }
    for sink in &music {
        sink.set_volume(settings.music_volume);
    }
}

pub struct GameAudioPlugin;

impl Plugin for GameAudioPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AudioSettings>()
            .add_event::<PlayCue>()
            .add_systems(Startup, setup_audio)
            .add_systems(Update, (play_cues, sync_music_volume));
    }
}
