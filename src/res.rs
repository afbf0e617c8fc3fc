#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

pub const GHIBLI_PROMPT: &str = include_res!(str, "/prompts/ghibli.txt");
pub const FOOD_ANALYSIS_PROMPT: &str = include_res!(str, "/prompts/food_analysis.txt");

pub fn assistant_prompt(context: &str) -> String {
    include_res!(str, "/prompts/assistant.txt").replace("{context}", context)
}
