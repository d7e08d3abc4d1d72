//! Paths of the remote task service.

pub const HEALTH: &str = "/health";
pub const TASKS: &str = "/tasks";

pub fn task(id: &str) -> String {
    format!("{}/{}", TASKS, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_path() {
        assert_eq!(task("abc-123"), "/tasks/abc-123");
    }
}
