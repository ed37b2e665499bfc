use std::time::Duration;

use mudbot_core::{SplitMix64, Spread};
use mudbot_kernel::config::TextConfig;
use mudbot_kernel::text::{compose, generate, replace_tags};
use mudbot_kernel::world::Character;
use mudbot_kernel::Personality;

#[test]
fn typing_takes_a_minute_per_speed_characters() {
    let personality = Personality::default();
    let msg = "x".repeat(200);
    assert_eq!(personality.type_duration(&msg), Duration::from_secs(60));
    assert_eq!(personality.read_duration(&msg), Duration::from_secs(12));
    assert_eq!(personality.type_duration(""), Duration::ZERO);

    let frozen = Personality {
        type_speed: 0.0,
        read_speed: 1000.0,
    };
    assert_eq!(frozen.type_duration("hello"), Duration::ZERO);
}

#[test]
fn generated_text_stays_within_word_bounds() {
    let mut rng = SplitMix64::new(11);
    for spread in [Spread::Linear, Spread::Square, Spread::Cube] {
        for _ in 0..200 {
            let text = generate(&mut rng, 2, 6, spread);
            let words = text.split_whitespace().count();
            assert!((2..6).contains(&words), "{words} words in {text:?}");
            assert!(text.ends_with('.'));
            assert!(text.chars().next().unwrap().is_uppercase());
        }
    }
}

#[test]
fn same_seed_same_text() {
    let a = generate(&mut SplitMix64::new(5), 2, 50, Spread::Linear);
    let b = generate(&mut SplitMix64::new(5), 2, 50, Spread::Linear);
    assert_eq!(a, b);
}

#[test]
fn leading_colon_phrase_is_a_pose() {
    let config = TextConfig {
        phrases: Some(vec![":waves.".to_string()]),
        ..TextConfig::default()
    };
    let message = compose(&mut SplitMix64::new(1), &config);
    assert!(message.pose);
    assert_eq!(message.text, "waves.");

    let config = TextConfig {
        phrases: Some(vec!["Hello!".to_string()]),
        ..TextConfig::default()
    };
    let message = compose(&mut SplitMix64::new(1), &config);
    assert!(!message.pose);
    assert_eq!(message.text, "Hello!");
}

#[test]
fn tags_name_the_character() {
    let mira = Character::new("npc-1", "Mira", "Vale");

    assert_eq!(replace_tags("waves to {name}.", &mira), "waves to Mira.");
    assert_eq!(
        replace_tags("{fullname} ({id}) of house {surname}", &mira),
        "Mira Vale (npc-1) of house Vale"
    );
    assert_eq!(replace_tags("hugs {nickname}", &mira), "hugs ???");
    assert_eq!(replace_tags("grins {name", &mira), "grins {name");
}
