//! Session assembly: one hub, one authority, and the bot participants.
//!
//! Every participant gets its own [`HeadlessScene`] built from the same
//! layout, so scene roots share a handle across processes. Each scene
//! holds a mirror of every avatar in participant order; a participant's
//! identity points at its own entry.

use collectible_core::config::SessionConfig;
use collectible_core::headless::HeadlessScene;
use collectible_core::loopback::{LoopbackChannel, LoopbackHub};
use collectible_core::participant::Participant;
use collectible_core::ports::{ChannelError, LocalEntity, LocalIdentity};
use collectible_types::{EntityHandle, UserId};
use glam::Vec3;
use tracing::info;

/// Participant type used by the headless engine.
pub type EngineParticipant = Participant<LoopbackChannel, HeadlessScene, LocalIdentity>;

/// A fully wired in-process session.
#[derive(Debug)]
pub struct Session {
    /// The replication hub shared by all participants.
    pub hub: LoopbackHub,
    /// Participants in tick order. Index 0 is the authority.
    pub participants: Vec<EngineParticipant>,
    /// `avatars[k][i]`: participant `i`'s avatar inside participant `k`'s scene.
    pub avatars: Vec<Vec<LocalEntity>>,
}

/// Where avatar `index` starts, on a ring around the region centre.
///
/// The ring clears every corner of the spawn square, so no avatar starts
/// inside a trigger volume.
fn start_position(index: usize, count: usize, half_extent: f32) -> Vec3 {
    let radius = half_extent.abs().mul_add(1.5, 1.0);
    let steps = u16::try_from(count.max(1)).unwrap_or(u16::MAX);
    let step = u16::try_from(index).unwrap_or(0);
    let angle = std::f32::consts::TAU * f32::from(step) / f32::from(steps);
    Vec3::new(radius * angle.cos(), 0.5, radius * angle.sin())
}

/// Build the session described by `config`.
///
/// # Errors
///
/// Returns [`ChannelError`] if a participant cannot join the hub.
pub fn build(config: &SessionConfig) -> Result<Session, ChannelError> {
    let hub = LoopbackHub::new();
    let root = EntityHandle::new();
    let guests = usize::try_from(config.bots.count).unwrap_or(usize::MAX);
    let count = guests.saturating_add(1);
    let users: Vec<UserId> = (0..count).map(|_| UserId::new()).collect();

    let mut participants = Vec::with_capacity(count);
    let mut avatars = Vec::with_capacity(count);

    for (index, user) in users.iter().enumerate() {
        let mut scene = HeadlessScene::with_anchor(root, &config.spawn.anchor_name);
        let mirrored: Vec<LocalEntity> = (0..count)
            .map(|i| scene.spawn_avatar(start_position(i, count, config.spawn.half_extent)))
            .collect();
        let own = mirrored.get(index).copied();

        let authority = index == 0;
        let name = if authority {
            "authority".to_owned()
        } else {
            format!("guest-{index}")
        };
        let channel = hub.join(authority)?;
        participants.push(Participant::new(
            name,
            config,
            channel,
            scene,
            LocalIdentity::new(*user, own),
        ));
        avatars.push(mirrored);
    }

    info!(
        participants = participants.len(),
        scene_root = %root,
        anchor = %config.spawn.anchor_name,
        "Session assembled"
    );

    Ok(Session {
        hub,
        participants,
        avatars,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use collectible_core::ports::{ActionChannel, IdentityProvider};

    use super::*;

    #[test]
    fn one_authority_and_mirrored_avatars() {
        let config = SessionConfig::default();
        let session = build(&config).unwrap();

        let count = usize::try_from(config.bots.count).unwrap() + 1;
        assert_eq!(session.participants.len(), count);
        assert_eq!(
            session
                .participants
                .iter()
                .filter(|p| p.channel().is_authority())
                .count(),
            1
        );
        for (k, participant) in session.participants.iter().enumerate() {
            assert_eq!(session.avatars[k].len(), count);
            assert_eq!(
                participant.identity().local_avatar(),
                Some(session.avatars[k][k])
            );
        }
    }

    #[test]
    fn avatars_start_clear_of_the_spawn_square() {
        for i in 0..7 {
            let p = start_position(i, 7, 10.0);
            assert!(p.x.abs().max(p.z.abs()) > 10.5);
            assert!(p.length() < 20.0);
        }
    }
}
