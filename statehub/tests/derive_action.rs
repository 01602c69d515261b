use statehub::{Action, ActionSummary};

#[derive(Action, Clone, Debug)]
enum Mixed {
    Unit,
    Tuple(u8, u8),
    Named { id: u32 },
    #[action(rename = "custom_name")]
    Renamed,
}

#[derive(Action, Clone, Debug)]
#[action(rename_all = "snake_case")]
enum Snake {
    LoadUser,
    #[action(rename = "Explicit")]
    SaveUser,
}

#[derive(Action, Clone, Debug)]
#[action(rename_all = "kebab-case")]
enum Kebab {
    OpenPanel,
}

#[derive(Action, Clone, Debug)]
#[action(rename_all = "SCREAMING_SNAKE_CASE")]
enum Screaming {
    ClosePanel,
}

#[derive(Action, Clone, Debug)]
struct Refresh;

#[derive(Action, Clone, Debug)]
#[action(rename = "set-title")]
struct SetTitle {
    title: String,
}

#[derive(Action, Clone, Debug)]
#[action(summary)]
enum Summarized {
    Payload(Vec<u8>),
}

#[derive(Clone, Debug)]
struct Wrapper<T>(T);

#[derive(Action, Clone, Debug)]
enum Generic<T: Clone + std::fmt::Debug + Send + Sync + 'static> {
    Wrap(Wrapper<T>),
}

#[test]
fn variant_names() {
    assert_eq!(Mixed::Unit.name(), "Unit");
    assert_eq!(Mixed::Tuple(1, 2).name(), "Tuple");
    assert_eq!(Mixed::Named { id: 3 }.name(), "Named");
    assert_eq!(Mixed::Renamed.name(), "custom_name");
}

#[test]
fn rename_all_rules() {
    assert_eq!(Snake::LoadUser.name(), "load_user");
    assert_eq!(Snake::SaveUser.name(), "Explicit");
    assert_eq!(Kebab::OpenPanel.name(), "open-panel");
    assert_eq!(Screaming::ClosePanel.name(), "CLOSE_PANEL");
}

#[test]
fn struct_actions() {
    assert_eq!(Refresh.name(), "Refresh");
    let action = SetTitle {
        title: "x".to_string(),
    };
    assert_eq!(action.name(), "set-title");
    assert_eq!(action.title, "x");
}

#[test]
fn summary_uses_debug() {
    assert_eq!(Summarized::Payload(vec![1, 2]).summary(), "Payload([1, 2])");
}

#[test]
fn generic_enum() {
    assert_eq!(Generic::Wrap(Wrapper(5_u8)).name(), "Wrap");
}
