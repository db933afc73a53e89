//! The substitution engine through its public API.

use std::collections::HashMap;

use ctox::env::{positional_args, Environment};
use ctox::subst::{
    expand_braces, expand_envlist, expand_template, matches_factor, split, split_on, MAX_DEPTH,
};
use ctox::CtoxError;
use proptest::prelude::*;

type Config = HashMap<(String, String), String>;

fn config(entries: &[(&str, &str, &str)]) -> Config {
    entries
        .iter()
        .map(|(s, o, v)| ((s.to_string(), o.to_string()), v.to_string()))
        .collect()
}

#[test]
fn envlist_cartesian_order() {
    assert_eq!(
        vec![
            "py26-django15",
            "py26-django16",
            "py27-django15",
            "py27-django16",
            "py32"
        ],
        expand_braces("{py26,py27}-django{15,16}, py32")
    );
    assert_eq!(vec!["A-C", "A-D", "B-C", "B-D"], expand_envlist("{A,B}-{C,D}"));
}

#[test]
fn tokenizer_examples() {
    assert_eq!(vec!["a", "b", "c,d"], split_on("a,b,'c,d'", ","));
    assert_eq!(vec!["a", "b", "c,d"], split_on("a,b,'''c,d'''", ","));
    assert_eq!(
        vec!["python", "-c", "print('hi there')"],
        split(r#"python -c "print('hi there')""#)
    );
}

#[test]
fn factor_examples() {
    assert!(matches_factor("py{33, 34}", "py34"));
    assert!(!matches_factor("py{33, 34}", "py26"));
}

#[test]
fn posargs_from_the_command_line() {
    let args: Vec<String> = ["arg1", "arg2", "--kwarg"].iter().map(|s| s.to_string()).collect();
    let config = Config::new();
    let env = Environment::new("py27", &config, &()).with_options(positional_args(&args));
    assert_eq!("pytest arg1 arg2", expand_template("pytest {posargs:tests}", &env).unwrap());
}

#[test]
fn config_reference_round_trip() {
    let config = config(&[("base", "ment", "pyfaker"), ("testenv", "x", "{[base]ment}")]);
    let env = Environment::new("py27", &config, &());
    assert_eq!("pyfaker", expand_template("{[testenv]x}", &env).unwrap());
}

#[test]
fn unknown_placeholder_is_reported_with_its_text() {
    let config = Config::new();
    let env = Environment::new("py27", &config, &());
    let err = expand_template("run {tox_version}", &env).unwrap_err();
    assert!(matches!(err, CtoxError::UnresolvedPlaceholder { ref placeholder } if placeholder == "tox_version"));
}

#[test]
fn self_reference_stops_after_max_depth() {
    let config = config(&[("a", "b", "x{[a]b}")]);
    let env = Environment::new("py27", &config, &());
    let expanded = expand_template("{[a]b}", &env).unwrap();
    assert_eq!(format!("{}{{[a]b}}", "x".repeat(MAX_DEPTH)), expanded);
}

proptest! {
    #[test]
    fn brace_free_text_is_a_fixed_point(s in "[^{}]{0,40}") {
        let config = Config::new();
        let env = Environment::new("py27", &config, &());
        prop_assert_eq!(&s, &expand_template(&s, &env).unwrap());
    }

    #[test]
    fn plain_names_expand_to_themselves(names in proptest::collection::vec("[a-z][a-z0-9]{0,6}", 1..6)) {
        prop_assert_eq!(names.clone(), expand_envlist(&names.join(", ")));
    }
}
