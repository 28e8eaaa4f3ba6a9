// CQL statements for the users table

pub const INSERT_USER: &str = r#"
    INSERT INTO users (user_id, name, email, created_at)
    VALUES (?, ?, ?, ?)
"#;

pub const SELECT_USER: &str = r#"
    SELECT user_id, name, email, created_at
    FROM users
    WHERE user_id = ?
"#;
