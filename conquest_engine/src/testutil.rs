//! Shared test fixtures: a deterministic two-kingdom session.

use conquest_rules::{Dex, DexData, GameConfig, PlayerId};
use rand::rngs::StdRng;

use crate::session::GameSession;

pub fn dex() -> Dex {
    let data = DexData::from_toml(
        r#"
        moves = ["tackle", "ember", "surge"]

        [[species]]
        name = "embercub"
        types = ["fire"]
        abilities = ["flareup", "quickfoot"]
        hidden_ability = "solarcore"

        [[species]]
        name = "aquarin"
        types = ["water"]
        abilities = ["torrent"]
        evolves_into = "embercub"
        evolve_level = 10
        evolve_friendship = 160
        evolve_battle = true
        "#,
    )
    .unwrap();
    Dex::from_data(&data).unwrap()
}

pub fn config() -> GameConfig {
    GameConfig::from_toml(
        r#"
        [[kingdoms]]
        name = "Northmarch"
        types = ["fire"]
        training_stats = ["atk", "spe"]
        wild_pool = ["embercub"]
        starter_pool = ["embercub"]
        neighbors = ["Southvale"]
        labors = ["defenders"]

        [[kingdoms.facilities]]
        kind = "shrine"

        [[kingdoms]]
        name = "Southvale"
        types = ["water"]
        training_stats = ["def"]
        wild_pool = ["aquarin"]
        starter_pool = ["aquarin"]
        labors = ["defenders"]

        [[kingdoms.facilities]]
        kind = "shrine"
        "#,
    )
    .unwrap()
}

pub struct Fixture {
    pub session: GameSession,
    pub alice: PlayerId,
    pub bob: PlayerId,
}

impl Fixture {
    pub fn rng(&mut self) -> &mut StdRng {
        self.session.rng_mut()
    }
}

/// Two adjacent kingdoms with one trainer each; it is Alice's turn.
pub fn fixture() -> Fixture {
    build(&[("Rowan", "embercub")], &[("Briar", "aquarin")])
}

/// The same map with two trainers on each side, for multi-party battles.
pub fn two_kingdom_fixture_with_extra_defender() -> Fixture {
    build(
        &[("Rowan", "embercub"), ("Eli", "embercub")],
        &[("Briar", "aquarin"), ("Wren", "aquarin")],
    )
}

/// Adds Eastreach behind Southvale; Bob rules both southern kingdoms.
pub fn three_kingdom_fixture() -> Fixture {
    let config = GameConfig::from_toml(
        r#"
        [[kingdoms]]
        name = "Northmarch"
        types = ["fire"]
        training_stats = ["atk", "spe"]
        wild_pool = ["embercub"]
        starter_pool = ["embercub"]
        neighbors = ["Southvale"]
        labors = ["defenders"]

        [[kingdoms.facilities]]
        kind = "shrine"

        [[kingdoms]]
        name = "Southvale"
        types = ["water"]
        training_stats = ["def"]
        wild_pool = ["aquarin"]
        starter_pool = ["aquarin"]
        neighbors = ["Eastreach"]
        labors = ["defenders"]

        [[kingdoms.facilities]]
        kind = "shrine"

        [[kingdoms]]
        name = "Eastreach"
        types = ["water"]
        training_stats = ["def"]
        labors = ["defenders"]
        "#,
    )
    .unwrap();
    let mut session = GameSession::new(dex(), &config, 42).unwrap();
    let alice = session.add_player("Alice").unwrap();
    let bob = session.add_player("Bob").unwrap();
    session.assign_kingdom(alice, 0).unwrap();
    session.assign_kingdom(bob, 1).unwrap();
    session.assign_kingdom(bob, 2).unwrap();
    session.add_trainer(0, "Rowan", "embercub").unwrap();
    session.add_trainer(1, "Briar", "aquarin").unwrap();
    session.add_trainer(1, "Wren", "aquarin").unwrap();
    session.start().unwrap();
    Fixture { session, alice, bob }
}

fn build(north: &[(&str, &str)], south: &[(&str, &str)]) -> Fixture {
    let mut session = GameSession::new(dex(), &config(), 42).unwrap();
    let alice = session.add_player("Alice").unwrap();
    let bob = session.add_player("Bob").unwrap();
    session.assign_kingdom(alice, 0).unwrap();
    session.assign_kingdom(bob, 1).unwrap();
    for (name, species) in north {
        session.add_trainer(0, name, species).unwrap();
    }
    for (name, species) in south {
        session.add_trainer(1, name, species).unwrap();
    }
    session.start().unwrap();
    Fixture { session, alice, bob }
}
