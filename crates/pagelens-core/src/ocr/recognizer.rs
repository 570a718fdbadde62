//! Word recognition with a CRNN model and greedy CTC decoding.

use image::GrayImage;
use ndarray::ArrayD;
use tracing::{debug, trace};

use crate::error::OcrError;
use pagelens_inference::{InferenceBackend, InputTensor};

use super::preprocessing::ImagePreprocessor;

/// Languages served by the built-in Latin dictionary.
const LATIN_LANGUAGES: [&str; 6] = ["eng", "latin", "pol", "deu", "fra", "spa"];

/// Text recognizer for single-word crops.
pub struct TextRecognizer<B: InferenceBackend> {
    backend: B,
    preprocessor: ImagePreprocessor,
    dictionary: Vec<char>,
    input_name: String,
}

/// Recognition result for a single word.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub text: String,
    /// Mean per-character probability (0.0 - 1.0).
    pub confidence: f32,
}

impl<B: InferenceBackend> TextRecognizer<B> {
    /// Wrap an already loaded backend.
    pub fn new(backend: B, dictionary: Vec<char>, preprocessor: ImagePreprocessor) -> Self {
        let input_name = backend
            .input_names()
            .first()
            .cloned()
            .unwrap_or_else(|| "x".to_string());

        Self {
            backend,
            preprocessor,
            dictionary,
            input_name,
        }
    }

    /// Load a recognition model from its bytes.
    ///
    /// `lang` is one or more `+`-separated language codes.
    pub fn from_model(bytes: &[u8], lang: &str, rec_height: u32) -> Result<Self, OcrError> {
        if bytes.is_empty() {
            return Err(OcrError::ModelLoad("model data is empty".to_string()));
        }

        let dictionary = dictionary_for_lang(lang)?;
        let preprocessor = ImagePreprocessor::new().with_rec_height(rec_height);

        let backend = B::from_bytes(bytes, &preprocessor.recognition_shape())
            .map_err(|e| OcrError::ModelLoad(e.to_string()))?;

        debug!(
            "Loaded recognition model ({} bytes, lang {}, {} classes)",
            bytes.len(),
            lang,
            dictionary.len()
        );

        Ok(Self::new(backend, dictionary, preprocessor))
    }

    /// Recognize the text in a grayscale word crop.
    pub fn recognize(&self, crop: &GrayImage) -> Result<RecognitionResult, OcrError> {
        let tensor = self.preprocessor.preprocess_for_recognition(crop);
        let input = InputTensor::Float32(tensor.into_dyn());

        let output = self
            .backend
            .run(&[(self.input_name.as_str(), input)])
            .map_err(|e| OcrError::Recognition(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| OcrError::Recognition("No output from model".to_string()))?
            .1
            .into_f32();

        let result = ctc_decode(&output, &self.dictionary)?;
        trace!("Recognized: '{}' (confidence: {:.3})", result.text, result.confidence);
        Ok(result)
    }
}

/// Dictionary for a `+`-separated language list.
pub fn dictionary_for_lang(lang: &str) -> Result<Vec<char>, OcrError> {
    let codes: Vec<&str> = lang.split('+').map(str::trim).collect();
    if codes.iter().any(|c| c.is_empty()) {
        return Err(OcrError::ModelLoad(format!("invalid language: {:?}", lang)));
    }

    match codes.iter().find(|c| !LATIN_LANGUAGES.contains(c)) {
        Some(code) => Err(OcrError::ModelLoad(format!("unsupported language: {}", code))),
        None => Ok(latin_dictionary()),
    }
}

/// Latin script classes. Index 0 is the CTC blank.
pub fn latin_dictionary() -> Vec<char> {
    let mut chars = vec![' '];

    chars.extend('0'..='9');
    chars.extend('A'..='Z');
    chars.extend('a'..='z');

    // pol
    chars.extend([
        'Ą', 'ą', 'Ć', 'ć', 'Ę', 'ę', 'Ł', 'ł', 'Ń', 'ń', 'Ó', 'ó', 'Ś', 'ś', 'Ź', 'ź', 'Ż', 'ż',
    ]);
    // deu
    chars.extend(['Ä', 'ä', 'Ö', 'ö', 'Ü', 'ü', 'ß']);
    // fra
    chars.extend([
        'À', 'à', 'Â', 'â', 'Ç', 'ç', 'È', 'è', 'É', 'é', 'Ê', 'ê', 'Ë', 'ë', 'Î', 'î', 'Ï', 'ï',
        'Ô', 'ô', 'Ù', 'ù', 'Û', 'û', 'Œ', 'œ',
    ]);
    // spa
    chars.extend(['Á', 'á', 'Í', 'í', 'Ñ', 'ñ', 'Ú', 'ú', '¿', '¡']);

    chars.extend([
        '.', ',', ';', ':', '!', '?', '-', '_', '/', '\\', '(', ')', '[', ']', '{', '}', '<', '>',
        '@', '#', '$', '%', '^', '&', '*', '+', '=', '|', '~', '`', '\'', '"', '€', '£', '§', '°',
    ]);

    chars
}

/// Greedy CTC decoding of a `[1, T, classes]` score tensor.
fn ctc_decode(output: &ArrayD<f32>, dictionary: &[char]) -> Result<RecognitionResult, OcrError> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] == 0 {
        return Err(OcrError::Recognition(format!(
            "Invalid output shape: {:?}",
            shape
        )));
    }

    let (seq_len, num_classes) = (shape[1], shape[2]);

    let mut text = String::new();
    let mut char_scores = Vec::new();
    let mut prev_idx = 0usize;

    for t in 0..seq_len {
        let mut max_idx = 0;
        let mut max_val = f32::NEG_INFINITY;
        for c in 0..num_classes {
            let val = output[[0, t, c]];
            if val > max_val {
                max_val = val;
                max_idx = c;
            }
        }

        // softmax probability of the winning class
        let sum_exp: f32 = (0..num_classes)
            .map(|c| (output[[0, t, c]] - max_val).exp())
            .sum();
        let probability = 1.0 / sum_exp;

        if max_idx != 0 && max_idx != prev_idx {
            if let Some(&c) = dictionary.get(max_idx) {
                text.push(c);
                char_scores.push(probability);
            }
        }
        prev_idx = max_idx;
    }

    let confidence = if char_scores.is_empty() {
        0.0
    } else {
        char_scores.iter().sum::<f32>() / char_scores.len() as f32
    };

    Ok(RecognitionResult { text, confidence })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, IxDyn};
    use pagelens_inference::{InferenceError, OutputTensor};
    use pretty_assertions::assert_eq;

    /// Scores with a single dominant class per timestep.
    fn scores(classes: &[usize], num_classes: usize) -> ArrayD<f32> {
        let mut arr = Array3::<f32>::zeros((1, classes.len(), num_classes));
        for (t, &c) in classes.iter().enumerate() {
            arr[[0, t, c]] = 20.0;
        }
        arr.into_dyn()
    }

    struct FixedBackend {
        output: ArrayD<f32>,
        names: Vec<String>,
    }

    impl InferenceBackend for FixedBackend {
        fn from_bytes(bytes: &[u8], _input_shape: &[usize]) -> pagelens_inference::Result<Self> {
            if bytes == b"bad" {
                return Err(InferenceError::ModelLoad("corrupt".to_string()));
            }
            Ok(Self {
                output: scores(&[1, 1, 0, 2], 4),
                names: vec!["input".to_string()],
            })
        }

        fn run(
            &self,
            inputs: &[(&str, InputTensor)],
        ) -> pagelens_inference::Result<Vec<(String, OutputTensor)>> {
            assert_eq!(inputs[0].0, "input");
            assert_eq!(inputs[0].1.shape(), &[1, 3, 48, 320]);
            Ok(vec![("out".to_string(), OutputTensor::Float32(self.output.clone()))])
        }

        fn input_names(&self) -> &[String] {
            &self.names
        }
    }

    #[test]
    fn test_ctc_collapses_repeats_and_blanks() {
        let dict = vec![' ', 'a', 'b', 'c'];
        let result = ctc_decode(&scores(&[1, 1, 0, 1, 2, 2, 0], 4), &dict).unwrap();
        assert_eq!(result.text, "aab");
        assert!(result.confidence > 0.99 && result.confidence <= 1.0);
    }

    #[test]
    fn test_ctc_all_blank() {
        let dict = vec![' ', 'a'];
        let result = ctc_decode(&scores(&[0, 0, 0], 2), &dict).unwrap();
        assert_eq!(result.text, "");
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_ctc_rejects_bad_shape() {
        let arr = ArrayD::<f32>::zeros(IxDyn(&[4, 4]));
        assert!(matches!(ctc_decode(&arr, &[' ']), Err(OcrError::Recognition(_))));
    }

    #[test]
    fn test_language_selection() {
        assert!(dictionary_for_lang("eng").is_ok());
        assert!(dictionary_for_lang("pol+eng").is_ok());
        assert!(matches!(dictionary_for_lang("jpn"), Err(OcrError::ModelLoad(_))));
        assert!(matches!(dictionary_for_lang("eng+"), Err(OcrError::ModelLoad(_))));
    }

    #[test]
    fn test_latin_dictionary() {
        let dict = latin_dictionary();
        assert_eq!(dict[0], ' ');
        for c in ['0', 'Z', 'z', 'ą', 'ß', 'é', 'ñ', '.'] {
            assert!(dict.contains(&c), "missing {}", c);
        }
    }

    #[test]
    fn test_recognize_with_backend() {
        let recognizer = TextRecognizer::<FixedBackend>::from_model(b"model", "eng", 48).unwrap();
        let crop = GrayImage::new(30, 12);
        let result = recognizer.recognize(&crop).unwrap();
        // classes 1 and 2 of the Latin dictionary
        assert_eq!(result.text, "01");
    }

    #[test]
    fn test_from_model_errors() {
        assert!(matches!(
            TextRecognizer::<FixedBackend>::from_model(b"", "eng", 48),
            Err(OcrError::ModelLoad(_))
        ));
        assert!(matches!(
            TextRecognizer::<FixedBackend>::from_model(b"bad", "eng", 48),
            Err(OcrError::ModelLoad(_))
        ));
        assert!(matches!(
            TextRecognizer::<FixedBackend>::from_model(b"model", "xyz", 48),
            Err(OcrError::ModelLoad(_))
        ));
    }
}
