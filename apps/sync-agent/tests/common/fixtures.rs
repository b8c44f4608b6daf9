//! Payload builders shaped like the global library's JSON.

use serde_json::{json, Value};

pub fn language(id: i64, code: &str) -> Value {
    json!({"id": id, "name": code.to_uppercase(), "code": code, "rtl": false})
}

pub fn category(id: i64, category_type: &str) -> Value {
    json!({
        "id": id,
        "title": {"en": format!("Category {}", id)},
        "type": category_type,
        "parent_id": null
    })
}

pub fn faq(id: i64, content: Value) -> Value {
    json!({
        "id": id,
        "title": {"en": format!("FAQ {}", id)},
        "content": content,
        "order": id
    })
}

pub fn exercise(id: i64, title: &str, categories: &[i64], files: &[i64]) -> Value {
    json!({
        "id": id,
        "title": {"en": title},
        "sets": 3,
        "reps": 12,
        "include_feedback": true,
        "get_pain_level": false,
        "additional_fields": [],
        "files": files,
        "categories": categories,
        "auto_translated": {"km": true},
        "created_at": "2024-03-01T08:00:00.000000Z",
        "updated_at": "2024-03-02 09:30:00",
        "deleted_at": null
    })
}

pub fn education_material(id: i64, files: Value, categories: &[i64]) -> Value {
    json!({
        "id": id,
        "title": {"en": format!("Material {}", id)},
        "file_id": files,
        "categories": categories,
        "auto_translated": {}
    })
}

pub fn questionnaire(id: i64, questions: Value, categories: &[i64]) -> Value {
    json!({
        "id": id,
        "title": {"en": format!("Questionnaire {}", id)},
        "description": {"en": "How are you?"},
        "questions": questions,
        "categories": categories
    })
}

pub fn question(id: i64, file_id: Option<i64>, answers: &[i64]) -> Value {
    json!({
        "id": id,
        "title": {"en": format!("Question {}", id)},
        "type": "checkbox",
        "mandatory": true,
        "file_id": file_id,
        "order": id,
        "answers": answers
            .iter()
            .map(|a| {
                json!({
                    "id": a,
                    "description": {"en": format!("Answer {}", a)},
                    "value": 1.0,
                    "order": a
                })
            })
            .collect::<Vec<_>>()
    })
}

/// Screening questionnaire with `sections` sections of `questions` questions,
/// each question carrying two options and one logic row.
///
/// Ids: section `id * 100 + s`, question `section * 100 + q`,
/// options `question * 10 + 1..=2`, logic `question * 10`.
pub fn screening_questionnaire(id: i64, sections: i64, questions: i64) -> Value {
    let sections: Vec<Value> = (1..=sections)
        .map(|s| {
            let section_id = id * 100 + s;
            let questions: Vec<Value> = (1..=questions)
                .map(|q| {
                    let question_id = section_id * 100 + q;
                    json!({
                        "id": question_id,
                        "title": {"en": format!("Question {}", question_id)},
                        "question_type": "multiple",
                        "mandatory": false,
                        "file_id": null,
                        "order": q,
                        "options": [
                            {"id": question_id * 10 + 1, "option_text": {"en": "Yes"},
                             "option_point": 1.0, "order": 1},
                            {"id": question_id * 10 + 2, "option_text": {"en": "No"},
                             "option_point": 0.0, "order": 2}
                        ],
                        "logics": [
                            {"id": question_id * 10, "target_question_id": question_id,
                             "target_option_id": question_id * 10 + 1,
                             "condition_type": "skip", "condition_rule": "equal"}
                        ]
                    })
                })
                .collect();
            json!({
                "id": section_id,
                "title": {"en": format!("Section {}", section_id)},
                "description": {},
                "order": s,
                "questions": questions
            })
        })
        .collect();

    json!({
        "id": id,
        "title": {"en": format!("Screening {}", id)},
        "description": {"en": "Intake"},
        "sections": sections
    })
}
