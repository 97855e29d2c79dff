/*
Pretty printing of the machine the benchmark ran on. Timing and memory
numbers are only comparable together with this context.
*/
use sys_info;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(PartialEq)]
#[derive(Tabled)]
pub struct EnvEntry {
    key: &'static str,
    value: String,
}

pub fn benchmark_environment() -> Vec<EnvEntry> {
    let cpu_num = sys_info::cpu_num().unwrap_or_default();
    let cpu_speed = sys_info::cpu_speed().unwrap_or_default();
    let mem_info = sys_info::mem_info().ok();
    let os_type = sys_info::os_type().unwrap_or_default();
    let os_release = sys_info::os_release().unwrap_or_default();
    let hostname = sys_info::hostname().unwrap_or_default();

    let environment = vec![
        EnvEntry { key: "Host", value: hostname },
        EnvEntry { key: "OS Type", value: os_type },
        EnvEntry { key: "OS Release", value: os_release },
        EnvEntry { key: "CPU Cores", value: cpu_num.to_string() },
        EnvEntry { key: "CPU Speed (MHz)", value: cpu_speed.to_string() },
        EnvEntry {
            key: "Memory Total (KB)",
            value: mem_info.as_ref().map(|m| m.total.to_string()).unwrap_or_default(),
        },
        EnvEntry {
            key: "Memory Free (KB)",
            value: mem_info.as_ref().map(|m| m.free.to_string()).unwrap_or_default(),
        },
    ];

    let mut table = Table::new(&environment);
    table.with(Style::modern_rounded());
    println!("Benchmark environment\n");
    println!("{}", table);
    environment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_contains_keys() {
        let output = benchmark_environment();
        assert!(output.iter().any(|info| info.key == "CPU Cores"));
        assert!(output.iter().any(|info| info.key == "Memory Total (KB)"));
        assert!(output.iter().any(|info| info.key == "OS Type"));
    }

    #[test]
    fn test_environment_not_empty() {
        let output = benchmark_environment();
        assert!(!output.is_empty());
    }
}
