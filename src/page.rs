//! The single HTML page. All state lives on the server; the script only
//! renders `/api/state` and posts the two actions.

use axum::response::Html;

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Leaf Analyzer</title>
    <style>
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
            background: linear-gradient(135deg, #2f855a 0%, #22543d 100%);
            min-height: 100vh;
            display: flex;
            align-items: flex-start;
            justify-content: center;
            padding: 20px;
        }

        .container {
            background: white;
            border-radius: 20px;
            box-shadow: 0 20px 60px rgba(0,0,0,0.3);
            max-width: 860px;
            width: 100%;
            padding: 40px;
        }

        h1 {
            color: #22543d;
            margin-bottom: 10px;
            font-size: 2em;
        }

        .subtitle {
            color: #666;
            margin-bottom: 30px;
            font-size: 0.9em;
        }

        .upload-area {
            border: 3px dashed #38a169;
            border-radius: 15px;
            padding: 40px 20px;
            text-align: center;
            cursor: pointer;
            transition: all 0.3s;
            background: #f0fff4;
        }

        .upload-area:hover,
        .upload-area.dragover {
            border-color: #22543d;
            background: #e6ffed;
        }

        .upload-area.disabled {
            opacity: 0.5;
            pointer-events: none;
        }

        .upload-icon {
            font-size: 3em;
            margin-bottom: 15px;
        }

        .upload-text {
            color: #2f855a;
            font-size: 1.2em;
            font-weight: 600;
            margin-bottom: 10px;
        }

        .upload-hint {
            color: #999;
            font-size: 0.9em;
        }

        input[type="file"] {
            display: none;
        }

        .loading {
            text-align: center;
            padding: 30px;
            display: none;
        }

        .spinner {
            border: 4px solid #f3f3f3;
            border-top: 4px solid #38a169;
            border-radius: 50%;
            width: 50px;
            height: 50px;
            animation: spin 1s linear infinite;
            margin: 0 auto 20px;
        }

        @keyframes spin {
            0% { transform: rotate(0deg); }
            100% { transform: rotate(360deg); }
        }

        .error {
            background: #fee;
            border: 2px solid #fcc;
            color: #c33;
            padding: 15px;
            border-radius: 10px;
            margin-top: 20px;
            display: none;
        }

        .result {
            margin-top: 30px;
            display: none;
        }

        .preview-image {
            max-width: 100%;
            max-height: 420px;
            display: block;
            margin: 0 auto 20px;
            border-radius: 10px;
            box-shadow: 0 4px 15px rgba(0,0,0,0.1);
        }

        .analysis {
            background: #f0fff4;
            border-radius: 10px;
            padding: 20px;
            color: #333;
            line-height: 1.6;
        }

        .analysis h3 {
            color: #22543d;
            margin: 18px 0 8px;
            font-size: 1.1em;
        }

        .analysis h3:first-child {
            margin-top: 0;
        }

        .analysis .field strong {
            color: #2f855a;
        }

        .analysis .bullet::before {
            content: "• ";
            color: #38a169;
        }

        .analysis p {
            margin: 4px 0;
        }

        .meta-info {
            display: flex;
            justify-content: space-between;
            align-items: center;
            margin-top: 15px;
            padding-top: 15px;
            border-top: 1px solid #e0e0e0;
            font-size: 0.85em;
            color: #666;
        }

        .badge {
            display: inline-block;
            background: #38a169;
            color: white;
            padding: 4px 12px;
            border-radius: 20px;
            font-size: 0.8em;
            font-weight: 600;
        }

        button {
            background: #2f855a;
            color: white;
            border: none;
            padding: 8px 18px;
            border-radius: 20px;
            font-weight: 600;
            cursor: pointer;
        }

        button:disabled {
            background: #9ae6b4;
            cursor: not-allowed;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>🍃 Leaf Analyzer</h1>
        <p class="subtitle">Upload a photo of a leaf to learn about the tree it came from</p>

        <div class="upload-area" id="uploadArea">
            <div class="upload-icon">📸</div>
            <div class="upload-text">Click or drag a leaf photo here</div>
            <div class="upload-hint">JPG or PNG • Max 20MB</div>
            <input type="file" id="fileInput" accept="image/jpeg,image/png,image/jpg">
        </div>

        <div class="loading" id="loading">
            <div class="spinner"></div>
            <p>Analyzing leaf...</p>
        </div>

        <div class="error" id="error"></div>

        <div class="result" id="result">
            <img id="previewImage" class="preview-image" alt="Leaf preview">
            <div class="analysis" id="analysis"></div>
            <div class="meta-info">
                <span>Model: <span class="badge" id="modelName">--</span></span>
                <span>Processing: <strong id="processingTime">--</strong>ms</span>
                <button id="reanalyzeButton">Analyze again</button>
            </div>
        </div>
    </div>

    <script>
        const uploadArea = document.getElementById('uploadArea');
        const fileInput = document.getElementById('fileInput');
        const loading = document.getElementById('loading');
        const errorDiv = document.getElementById('error');
        const result = document.getElementById('result');
        const previewImage = document.getElementById('previewImage');
        const analysis = document.getElementById('analysis');
        const modelName = document.getElementById('modelName');
        const processingTime = document.getElementById('processingTime');
        const reanalyzeButton = document.getElementById('reanalyzeButton');

        let busy = false;

        function setBusy(value) {
            busy = value;
            loading.style.display = value ? 'block' : 'none';
            uploadArea.classList.toggle('disabled', value);
            reanalyzeButton.disabled = value;
        }

        function renderRecord(record) {
            switch (record.kind) {
                case 'section_header': {
                    const h = document.createElement('h3');
                    h.textContent = record.title;
                    return h;
                }
                case 'labeled_field': {
                    const p = document.createElement('p');
                    p.className = 'field';
                    const label = document.createElement('strong');
                    label.textContent = record.label + ': ';
                    p.appendChild(label);
                    p.appendChild(document.createTextNode(record.value));
                    return p;
                }
                case 'bullet': {
                    const p = document.createElement('p');
                    p.className = 'bullet';
                    p.textContent = record.text;
                    return p;
                }
                default: {
                    const p = document.createElement('p');
                    p.textContent = record.text;
                    return p;
                }
            }
        }

        function render(state) {
            setBusy(state.loading);

            if (state.error) {
                errorDiv.textContent = state.error;
                errorDiv.style.display = 'block';
            } else {
                errorDiv.style.display = 'none';
            }

            if (state.image) {
                previewImage.src = state.image;
                result.style.display = 'block';
            }

            analysis.replaceChildren(...state.records.map(renderRecord));
            modelName.textContent = state.model;
            processingTime.textContent = state.processing_time_ms ?? '--';
            reanalyzeButton.disabled = state.loading || !state.image;

            if (state.loading) {
                setTimeout(refresh, 1000);
            }
        }

        async function refresh() {
            try {
                const response = await fetch('/api/state');
                render(await response.json());
            } catch (error) {
                errorDiv.textContent = 'Error: ' + error.message;
                errorDiv.style.display = 'block';
            }
        }

        async function post(url, body) {
            setBusy(true);
            errorDiv.style.display = 'none';
            try {
                const response = await fetch(url, { method: 'POST', body });
                render(await response.json());
            } catch (error) {
                setBusy(false);
                errorDiv.textContent = 'Error: ' + error.message;
                errorDiv.style.display = 'block';
            }
        }

        function handleFile(file) {
            if (busy || !file) {
                return;
            }
            const formData = new FormData();
            formData.append('image', file);
            post('/api/upload', formData);
        }

        uploadArea.addEventListener('click', () => fileInput.click());

        uploadArea.addEventListener('dragover', (e) => {
            e.preventDefault();
            uploadArea.classList.add('dragover');
        });

        uploadArea.addEventListener('dragleave', () => {
            uploadArea.classList.remove('dragover');
        });

        uploadArea.addEventListener('drop', (e) => {
            e.preventDefault();
            uploadArea.classList.remove('dragover');
            handleFile(e.dataTransfer.files[0]);
        });

        fileInput.addEventListener('change', (e) => {
            const file = e.target.files[0];
            // Reset so choosing the same file again still fires `change`.
            fileInput.value = '';
            handleFile(file);
        });

        reanalyzeButton.addEventListener('click', () => {
            if (!busy) {
                post('/api/reanalyze');
            }
        });

        refresh();
    </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_input_accepts_only_listed_types() {
        assert!(INDEX_HTML.contains(r#"accept="image/jpeg,image/png,image/jpg""#));
    }
}
