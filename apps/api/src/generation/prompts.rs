// All prompt constants for the generation pipeline.
// The persona lock, negative constraints, and language rules are injected
// verbatim into every template — tests assert on these exact strings.

/// Separator between the system role text and the user payload in the
/// application-mode templates. Chat backends that support a system role
/// split on this; everyone else sends the prompt as-is.
pub use crate::providers::SYSTEM_SEPARATOR;

/// Identity block: the model writes as the human applicant, never as itself.
pub const PERSONA_LOCK: &str = "\
!!! URGENT INSTRUCTIONS !!!
1. IDENTITY LOCK: You are NOT an AI. You are a REAL HUMAN APPLICANT.
2. GOAL: Write a convincing, personal answer to get accepted.
3. VOICE: First-person ('I', 'me', 'my'). Authentic and enthusiastic.
4. ADHERENCE: Answer directly using ONLY the provided context.
";

pub const NEGATIVE_CONSTRAINTS: &str = "\
NEGATIVE CONSTRAINTS (Violating these = FAIL):
- NEVER say 'As an AI', 'As a language model', or 'Here is a draft'.
- NEVER use robotic transitions like 'Furthermore', 'Moreover', 'In conclusion'.
- NEVER explain what you are doing. JUST WRITE THE ANSWER.
- NEVER use asterisks (*) or markdown formatting.
";

/// Register constraints: A2 vocabulary, no hyphenated compounds, no
/// emphasis markup. This is a content-policy invariant, not formatting.
pub const LANGUAGE_RULES: &str = "\
CRITICAL LANGUAGE RULES:
- Use ONLY A2-level English (simple, clear vocabulary and grammar).
- NEVER use hyphens in compound words (write 'community based' NOT 'community-based', 'health care' NOT 'health-care').
- NEVER use asterisks (*) for any reason - no bold, no italic, no emphasis marks.
- Keep sentences short and simple.
- Use only plain text without any formatting symbols.
";

/// Response structure demanded by the batch template; the answer parser's
/// primary pattern matches this shape.
pub const BATCH_OUTPUT_FORMAT: &str = "\
OUTPUT FORMAT (strict):
1. Answer:
...
2. Answer:
...
(Continue until the last question. No extra text.)
";

/// Short factual fields get short factual answers, not essays.
pub const SHORT_FIELD_RULES: &str = "\
If the question asks:
- Name -> return only the name.
- Email -> return only the email.
- Date -> return only the date.
- Yes/No -> return only Yes or No.
- Short factual field -> return only the direct value.
Break this rule and the answer is invalid.
";

/// Prefix prepended to the original prompt for the one-shot persona-leak
/// regeneration.
pub const PERSONA_RECOVERY_PREFIX: &str =
    "Reminder: You are the applicant. Answer as a human applicant. ";

/// Strict extraction instruction: only `?`-terminated lines and clear form
/// labels survive. Append the source text after this.
pub const EXTRACTION_STRICT_PROMPT: &str = "\
Extract ONLY explicit application form questions.

Ignore:
- CV content
- Personal information blocks
- Website navigation
- Headers
- Legal disclaimers
- Descriptions
- Project explanations
- Repeated content
- Lines without question marks unless they are clearly form fields.
- Lines containing 'Info Pack', 'Click the Link', 'Google Forms', 'Please read carefully', 'AI prohibited', 'Navigation', 'Blog', 'Copyright'.
- CV sections like 'WORK EXPERIENCE', 'EDUCATION AND TRAINING', 'Passport:', 'Date of birth:', 'Phone number:', 'LinkedIn:'.

ONLY include lines that:
- End with '?'
- OR are clear form labels such as:
  Name and Surname
  Email Address
  Phone Number
  Date of Birth
  Gender
  City
  Passport Type
  Level of English
  Yes/No questions

If a line is a label (e.g. 'Name and Surname'), convert it to a question (e.g. 'What is your name and surname?').

Do NOT include paragraphs.
Do NOT include CV blocks.
Do NOT include descriptive text.

Return questions as a numbered list only.

TEXT TO EXTRACT FROM:
";

/// Advanced extraction instruction: also captures labels without question
/// marks (name, email, passport type, ...).
pub const EXTRACTION_ADVANCED_PROMPT: &str = "\
Extract ALL application form fields and questions.

TARGETS TO EXTRACT:
1. Questions ending with '?'.
2. Form fields that require user input (e.g., 'Name', 'Email', 'Phone', 'Date of Birth', 'Passport Type', 'Gender', 'City', 'University', 'Major', 'Instagram').
3. Short lines (< 80 chars) starting with a capital letter that look like labels.

IGNORE:
- Lines containing 'Info Pack', 'Click', 'AI prohibited', 'Google Forms', 'Navigation', 'Blog', 'Search', 'Contact', 'Copyright'.
- URLs (http/https).
- Paragraphs longer than 150 characters.
- CV sections (WORK EXPERIENCE, EDUCATION).

TRANSFORMATION RULES:
- If a line is a label (e.g. 'Name and Surname'), convert it to a natural question (e.g. 'What is your name and surname?').
- If a line is 'Date of Birth', convert to 'What is your date of birth?'.
- Keep 'Do you have a Passport?' as is.

Return the final list of questions/fields as a numbered list.

TEXT TO EXTRACT FROM:
";

/// Whole-document summarization instruction for the model-assisted
/// reduction tier. The (capped) input slice goes between header and suffix.
pub const SMART_REDUCE_PROMPT: &str = "\
You are an expert content summarizer for professional applications.
Your goal is to reduce the text length while preserving CRITICAL information for an application form.

INSTRUCTIONS:
1. Keep ALL specific questions found in the text.
2. Keep ALL personal experience details (dates, roles, companies).
3. Keep ALL project description details.
4. REMOVE: Navigation text, website footers, legal disclaimers, cookie warnings, duplicate paragraphs.
5. REMOVE: Generic instructions like 'Please fill this form'.

INPUT TEXT:
================
";

pub const SMART_REDUCE_PROMPT_SUFFIX: &str = "
================

OUTPUT (Condensed Version):";

/// Compression instruction for the context-cache path.
pub const COMPRESSION_PROMPT: &str = "\
Compress the following mobility application context.
Keep only:
- Education
- Work experience
- Skills
- Relevant achievements
- Information relevant to the program or internship

Remove repetition.
Keep it under 2000 characters.
Keep structured bullet format.

CONTEXT TO COMPRESS:
";

/// Per-question reduction instruction. The question and the capped context
/// are spliced in by the reducer.
pub const QUESTION_REDUCE_PROMPT_HEADER: &str = "\
You are an expert context reducer.
Your goal is to extract ONLY the information from the provided context that is relevant to answering the specific question below.

QUESTION:
";

pub const QUESTION_REDUCE_PROMPT_RULES: &str = "
INSTRUCTIONS:
1. Keep only the parts relevant to this specific question.
2. Remove navigation text, unrelated sections, repeated information, legal warnings, and footer text.
3. If the context contains the answer or relevant experience, keep it.
4. If the context contains the specific question itself, keep the surrounding details.

CONTEXT:
================
";

pub const QUESTION_REDUCE_PROMPT_SUFFIX: &str = "
================

OUTPUT (Reduced Context):";
